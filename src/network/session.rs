// Per-session play state
// Turns inbound server messages into outbound commands, without doing I/O

use tracing::{debug, info, warn};

use super::protocol::{ClientMessage, Direction, GameStatus, PaddleSide, Scores, ServerMessage};
use crate::ai::{extract_observation, ObservationLayout, Policy};

/// Why a play loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Snapshot reported `finished`
    Finished(Scores),
    /// Server sent `gameOver`
    GameOver,
    /// Server sent `error`
    ServerError(String),
    /// A frame could not be decoded
    ProtocolError(String),
    /// The stream closed or failed
    ConnectionLost,
    /// `stop()` was requested
    Stopped,
    /// The connection could not be opened; the loop never ran
    ConnectFailed,
    /// The loop ended on an unexpected failure inside the client
    Aborted(String),
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Step {
    /// Command to send, if any
    pub outbound: Option<ClientMessage>,
    /// Set when the message ends the session
    pub end: Option<SessionOutcome>,
}

impl Step {
    fn send(message: ClientMessage) -> Self {
        Self {
            outbound: Some(message),
            end: None,
        }
    }

    fn end(outcome: SessionOutcome) -> Self {
        Self {
            outbound: None,
            end: Some(outcome),
        }
    }
}

/// Loop state for one game session
#[derive(Debug, Clone)]
pub struct SessionState {
    side: PaddleSide,
    layout: ObservationLayout,
    start_sent: bool,
    current_action: Direction,
    /// Observations that fell back to the default vector
    fallbacks: u64,
}

impl SessionState {
    pub fn new(side: PaddleSide, layout: ObservationLayout) -> Self {
        Self {
            side,
            layout,
            start_sent: false,
            current_action: Direction::Stop,
            fallbacks: 0,
        }
    }

    pub fn current_action(&self) -> Direction {
        self.current_action
    }

    pub fn start_sent(&self) -> bool {
        self.start_sent
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Handle one inbound message
    pub fn on_message(&mut self, message: &ServerMessage, policy: &mut dyn Policy) -> Step {
        match message {
            ServerMessage::State(snapshot) => {
                let status = snapshot.status();
                debug!(?status, "Received state");

                match status {
                    Some(GameStatus::Waiting) => {
                        if self.start_sent {
                            return Step::default();
                        }
                        info!("🎮 Game waiting, sending start command");
                        self.start_sent = true;
                        Step::send(ClientMessage::Start)
                    }
                    Some(GameStatus::Playing) => {
                        let extraction = extract_observation(snapshot, self.layout);
                        if extraction.fell_back {
                            self.fallbacks += 1;
                        }
                        let direction = policy.decide(&extraction.vector);
                        if direction == self.current_action {
                            return Step::default();
                        }
                        self.current_action = direction;
                        Step::send(ClientMessage::Paddle {
                            paddle: self.side,
                            direction,
                        })
                    }
                    Some(GameStatus::Finished) => {
                        let scores = snapshot.scores();
                        info!("Game finished! Score: {} - {}", scores.left, scores.right);
                        Step::end(SessionOutcome::Finished(scores))
                    }
                    Some(GameStatus::Paused) | None => Step::default(),
                }
            }
            ServerMessage::GameOver { message } => {
                info!(message = message.as_deref().unwrap_or(""), "Game over");
                Step::end(SessionOutcome::GameOver)
            }
            ServerMessage::Connected { session_id } => {
                info!(session_id = session_id.as_deref().unwrap_or(""), "Received connected message");
                Step::default()
            }
            ServerMessage::Pong => {
                debug!("Received pong");
                Step::default()
            }
            ServerMessage::Error { message } => {
                let message = message.clone().unwrap_or_default();
                warn!(%message, "Server reported an error");
                Step::end(SessionOutcome::ServerError(message))
            }
            ServerMessage::Unknown { kind } => {
                warn!(%kind, "Received unknown message type");
                Step::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::Snapshot;
    use serde_json::json;

    /// Returns a scripted direction and records every observation it sees
    struct ScriptedPolicy {
        direction: Direction,
        seen: Vec<Vec<f32>>,
    }

    impl ScriptedPolicy {
        fn new(direction: Direction) -> Self {
            Self {
                direction,
                seen: Vec::new(),
            }
        }
    }

    impl Policy for ScriptedPolicy {
        fn decide(&mut self, observation: &[f32]) -> Direction {
            self.seen.push(observation.to_vec());
            self.direction
        }

        fn layout(&self) -> ObservationLayout {
            ObservationLayout::Full
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn state(data: serde_json::Value) -> ServerMessage {
        ServerMessage::State(Snapshot::new(data))
    }

    fn playing() -> ServerMessage {
        state(json!({
            "status": "playing",
            "ball": {"x": 10, "y": 20},
            "paddles": {"left": {"y": 0, "height": 100}, "right": {"y": 250, "height": 100}}
        }))
    }

    fn session() -> SessionState {
        SessionState::new(PaddleSide::Right, ObservationLayout::Full)
    }

    #[test]
    fn test_start_sent_once() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Stop);
        let waiting = state(json!({"status": "waiting"}));

        assert_eq!(
            session.on_message(&waiting, &mut policy).outbound,
            Some(ClientMessage::Start)
        );
        assert_eq!(session.on_message(&waiting, &mut policy), Step::default());
        assert_eq!(session.on_message(&waiting, &mut policy), Step::default());
        assert!(session.start_sent());
    }

    #[test]
    fn test_repeated_direction_sends_once() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Up);

        let first = session.on_message(&playing(), &mut policy);
        let second = session.on_message(&playing(), &mut policy);

        assert_eq!(
            first.outbound,
            Some(ClientMessage::Paddle {
                paddle: PaddleSide::Right,
                direction: Direction::Up
            })
        );
        assert_eq!(second, Step::default());
        assert_eq!(session.current_action(), Direction::Up);
        assert_eq!(policy.seen.len(), 2);
    }

    #[test]
    fn test_stop_is_not_sent_initially() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Stop);

        assert_eq!(session.on_message(&playing(), &mut policy), Step::default());
    }

    #[test]
    fn test_policy_sees_extracted_observation() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Down);

        session.on_message(&playing(), &mut policy);
        assert_eq!(policy.seen, vec![vec![10.0, 20.0, 0.0, 0.0, 50.0, 300.0]]);
    }

    #[test]
    fn test_bad_snapshot_keeps_session_alive() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Up);
        let broken = state(json!({"status": "playing", "ball": {"y": 20}}));

        let step = session.on_message(&broken, &mut policy);
        assert_eq!(step.end, None);
        assert_eq!(session.fallbacks(), 1);
        assert_eq!(policy.seen, vec![vec![400.0, 300.0, 0.0, 0.0, 300.0, 300.0]]);
    }

    #[test]
    fn test_terminal_messages() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Stop);

        let finished = state(json!({"status": "finished", "scores": {"left": 5, "right": 3}}));
        assert_eq!(
            session.on_message(&finished, &mut policy).end,
            Some(SessionOutcome::Finished(Scores { left: 5, right: 3 }))
        );
        assert_eq!(
            session
                .on_message(&ServerMessage::GameOver { message: None }, &mut policy)
                .end,
            Some(SessionOutcome::GameOver)
        );
        assert_eq!(
            session
                .on_message(
                    &ServerMessage::Error {
                        message: Some("No game at this session".to_string())
                    },
                    &mut policy
                )
                .end,
            Some(SessionOutcome::ServerError("No game at this session".to_string()))
        );
    }

    #[test]
    fn test_informational_messages_are_ignored() {
        let mut session = session();
        let mut policy = ScriptedPolicy::new(Direction::Up);

        let messages = [
            ServerMessage::Connected { session_id: Some("s1".to_string()) },
            ServerMessage::Pong,
            ServerMessage::Unknown { kind: "spectate".to_string() },
            state(json!({"status": "paused"})),
            state(json!({"status": "rewinding"})),
        ];
        for message in &messages {
            assert_eq!(session.on_message(message, &mut policy), Step::default());
        }
        assert!(policy.seen.is_empty());
    }
}
