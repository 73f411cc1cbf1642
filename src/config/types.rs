// pong-ai configuration types
// All settings with defaults matching the game service deployment

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::{ObservationLayout, PolicyKind};
use crate::network::PaddleSide;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    // Game service WebSocket base URL; the session id is appended as a path segment
    pub game_service_url: String,

    // Longest wait for an inbound message before sending a keepalive ping
    pub receive_timeout_ms: u64,

    // Longest wait for the WebSocket handshake
    pub connect_timeout_ms: u64,

    // Paddle controlled for the whole session
    pub paddle: PaddleSide,

    // Observation vector layout; must match the policy
    pub observation: ObservationLayout,
}

/// Floor for both client timeouts
pub const MIN_TIMEOUT_MS: u64 = 50;

impl ClientConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms.max(MIN_TIMEOUT_MS))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(MIN_TIMEOUT_MS))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            game_service_url: "ws://game-service:3003".to_string(),
            receive_timeout_ms: 5000,
            connect_timeout_ms: 10_000,
            paddle: PaddleSide::Right,
            observation: ObservationLayout::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    // Policy kind: "linear", "tracking", "intercept"
    pub kind: PolicyKind,

    // Exported model weights (JSON), used by the linear policy
    pub model_path: PathBuf,

    // Take the best action instead of sampling
    pub deterministic: bool,

    // Game field size in server units
    pub field_width: f32,
    pub field_height: f32,

    // Distance to target below which built-in policies hold still
    pub dead_zone: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::Linear,
            model_path: PathBuf::from("models/best_model.json"),
            deterministic: true,
            field_width: 800.0,
            field_height: 600.0,
            dead_zone: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3006,
        }
    }
}
