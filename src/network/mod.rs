// Network module for the pong AI player
// Handles the game-service WebSocket, message decoding and the play loop

pub mod client;
pub mod protocol;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{session_url, ConnectionState, GameClient, StopHandle};
pub use protocol::{ClientMessage, Direction, GameStatus, PaddleSide, Scores, ServerMessage, Snapshot};
pub use session::{SessionOutcome, SessionState, Step};
