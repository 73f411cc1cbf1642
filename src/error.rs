// Error types for the pong AI player

use std::path::PathBuf;

use thiserror::Error;

use crate::ai::ObservationLayout;

/// A text frame that cannot be interpreted as a server message
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no string \"type\" field")]
    MissingType,
}

/// Failures of the game-session client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("timed out connecting to {url} after {timeout_ms} ms")]
    ConnectTimeout { url: String, timeout_ms: u64 },
    #[error("failed to send message: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("policy expects {policy:?} observations but the client is configured for {client:?}")]
    LayoutMismatch {
        policy: ObservationLayout,
        client: ObservationLayout,
    },
}

/// Failures loading or building a decision policy
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("AI model not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to load AI model: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to load AI model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model shape: {0}")]
    Shape(String),
    #[error("policy is not ready: {0}")]
    NotReady(String),
    #[error("{kind} policy requires {required:?} observations")]
    UnsupportedLayout {
        kind: &'static str,
        required: ObservationLayout,
    },
}

/// Failures writing the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
