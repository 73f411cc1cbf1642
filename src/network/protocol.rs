// Pong game-service wire protocol
// JSON text frames tagged by "type", exchanged over the session WebSocket

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ProtocolError;

/// Paddle movement command understood by the game service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Stop,
    Up,
    Down,
}

impl Direction {
    /// Map a discrete policy action index to a direction (0 = stop, 1 = up, 2 = down)
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Direction::Stop),
            1 => Some(Direction::Up),
            2 => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Direction::Stop => 0,
            Direction::Up => 1,
            Direction::Down => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Stop => "stop",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Which paddle a client controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddleSide {
    Left,
    Right,
}

impl PaddleSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaddleSide::Left => "left",
            PaddleSide::Right => "right",
        }
    }
}

/// Lifecycle status carried inside every state snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    Playing,
    Paused,
    Finished,
}

impl GameStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "waiting" => Some(GameStatus::Waiting),
            "playing" => Some(GameStatus::Playing),
            "paused" => Some(GameStatus::Paused),
            "finished" => Some(GameStatus::Finished),
            _ => None,
        }
    }
}

/// Final or running score pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores {
    pub left: u64,
    pub right: u64,
}

/// Game snapshot embedded in a `state` message.
///
/// Kept as raw JSON: only the fields the client reads are interpreted, and
/// observation extraction decides for itself how to treat missing fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot(Value);

impl Snapshot {
    pub fn new(data: Value) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &Value {
        &self.0
    }

    /// `None` when the status is absent or not one the service defines
    pub fn status(&self) -> Option<GameStatus> {
        self.0
            .get("status")
            .and_then(Value::as_str)
            .and_then(GameStatus::parse)
    }

    /// Scores with missing sides reported as zero. Whole-valued floats
    /// such as `3.0` are accepted; other values are logged and read as zero.
    pub fn scores(&self) -> Scores {
        let side = |name: &str| match self.0.get("scores").and_then(|s| s.get(name)) {
            None | Some(Value::Null) => 0,
            Some(value) => score_value(value).unwrap_or_else(|| {
                warn!(side = name, %value, "Unreadable score, using 0");
                0
            }),
        };
        Scores {
            left: side("left"),
            right: side("right"),
        }
    }
}

fn score_value(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// Messages the game service sends to a connected player
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Periodic game snapshot
    State(Snapshot),

    /// Game stopped or finished (sent independently of the `finished` status)
    GameOver { message: Option<String> },

    /// Connection acknowledgement
    Connected { session_id: Option<String> },

    /// Reply to a `ping`
    Pong,

    /// Fatal error reported by the service
    Error { message: Option<String> },

    /// Any other `type` tag; carried so it can be logged and skipped
    Unknown { kind: String },
}

/// Optional string field of an inbound frame. A field of the wrong type
/// reads as absent and is logged.
fn optional_str(value: &Value, kind: &str, field: &str) -> Option<String> {
    match value.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            warn!(kind, field, value = %other, "Ignoring mistyped field");
            None
        }
    }
}

impl ServerMessage {
    /// Decode one text frame.
    ///
    /// Fails only when the frame is not JSON or lacks a string `type`.
    /// Informational fields of the wrong type decode as `None`, and unknown
    /// tags decode to [`ServerMessage::Unknown`].
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;

        let message = match kind {
            "state" => ServerMessage::State(Snapshot(value.get("data").cloned().unwrap_or_default())),
            "gameOver" => ServerMessage::GameOver {
                message: optional_str(&value, kind, "message"),
            },
            "connected" => ServerMessage::Connected {
                session_id: optional_str(&value, kind, "sessionId"),
            },
            "pong" => ServerMessage::Pong,
            "error" => ServerMessage::Error {
                message: optional_str(&value, kind, "message"),
            },
            _ => ServerMessage::Unknown {
                kind: kind.to_string(),
            },
        };
        Ok(message)
    }

    /// Tag name, for logging
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::State(_) => "state",
            ServerMessage::GameOver { .. } => "gameOver",
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::Pong => "pong",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Unknown { kind } => kind.as_str(),
        }
    }
}

/// Messages a player sends to the game service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Liveness probe; answered with `pong`
    Ping,

    /// Ask a waiting game to begin
    Start,

    /// Ask the service to end the game (not sent by the play loop)
    Stop,

    /// Set the movement of one paddle
    Paddle {
        paddle: PaddleSide,
        direction: Direction,
    },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
