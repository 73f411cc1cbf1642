// pong-ai - AI paddle player for remote Pong game sessions

pub mod ai;
pub mod config;
pub mod control;
pub mod error;
pub mod network;
