// Game-session client
// Drives one policy against one remote game session over a WebSocket

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::protocol::{ClientMessage, Direction, PaddleSide, ServerMessage};
use super::session::{SessionOutcome, SessionState};
use crate::ai::{ObservationLayout, Policy};
use crate::config::ClientConfig;
use crate::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of the client's single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// Cloneable handle that asks a running play loop to stop
///
/// The request is sticky: a loop started after `stop()` exits immediately.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Connection target for a session: `<base_url>/<session_id>`
pub fn session_url(base_url: &str, session_id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), session_id)
}

/// AI player for one game session
pub struct GameClient {
    base_url: String,
    side: PaddleSide,
    layout: ObservationLayout,
    receive_timeout: Duration,
    connect_timeout: Duration,
    policy: Box<dyn Policy>,
    socket: Option<WsStream>,
    state: ConnectionState,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl GameClient {
    /// Create a client; fails if the policy was produced for another observation layout
    pub fn new(config: &ClientConfig, policy: Box<dyn Policy>) -> Result<Self, ClientError> {
        if policy.layout() != config.observation {
            return Err(ClientError::LayoutMismatch {
                policy: policy.layout(),
                client: config.observation,
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(Self {
            base_url: config.game_service_url.clone(),
            side: config.paddle,
            layout: config.observation,
            receive_timeout: config.receive_timeout(),
            connect_timeout: config.connect_timeout(),
            policy,
            socket: None,
            state: ConnectionState::Disconnected,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn side(&self) -> PaddleSide {
        self.side
    }

    /// A connection is usable only while it exists and is open
    pub fn is_connected(&self) -> bool {
        self.socket.is_some() && self.state == ConnectionState::Connected
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Ask the play loop to exit; observed before the next receive completes
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Open the session WebSocket. Failures are logged and reported as `false`.
    pub async fn connect(&mut self, session_id: &str) -> bool {
        if self.socket.is_some() {
            self.disconnect().await;
        }

        let url = session_url(&self.base_url, session_id);
        info!(%url, "AI connecting");
        self.state = ConnectionState::Connecting;

        match open_socket(&url, self.connect_timeout).await {
            Ok(socket) => {
                self.socket = Some(socket);
                self.state = ConnectionState::Connected;
                info!(session_id, "AI connected to session");
                true
            }
            Err(e) => {
                error!(session_id, error = %e, "AI connection failed");
                self.state = ConnectionState::Disconnected;
                false
            }
        }
    }

    /// Close the connection if there is one. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        let Some(mut socket) = self.socket.take() else {
            return;
        };

        // Also flushes the reply when the server closed first
        if let Err(e) = socket.close(None).await {
            debug!(error = %e, "Close handshake did not complete");
        }
        self.state = ConnectionState::Closed;
        info!("AI disconnected");
    }

    /// Send a paddle command for our side; silently skipped when not connected
    pub async fn send_command(&mut self, direction: Direction) -> Result<(), ClientError> {
        debug!(direction = direction.as_str(), "Sending paddle action");
        let message = ClientMessage::Paddle {
            paddle: self.side,
            direction,
        };
        self.send_message(&message).await
    }

    async fn send_message(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Ok(());
        }
        let text = message.encode()?;
        let Some(socket) = self.socket.as_mut() else {
            return Ok(());
        };

        if let Err(e) = socket.send(Message::Text(text)).await {
            self.state = ConnectionState::Closed;
            return Err(ClientError::Send(e));
        }
        Ok(())
    }

    /// Play one session to completion.
    ///
    /// Returns without sending anything if the connection cannot be opened.
    /// Otherwise the connection is released on every exit path, and no error
    /// or panic from the loop escapes.
    pub async fn play(&mut self, session_id: &str) -> SessionOutcome {
        info!(session_id, "AI play() called");

        if !self.connect(session_id).await {
            info!(session_id, "AI failed to connect, exiting play()");
            return SessionOutcome::ConnectFailed;
        }

        let outcome = match AssertUnwindSafe(self.run(session_id)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                error!(session_id, %reason, "Error in game loop");
                SessionOutcome::Aborted(reason)
            }
        };

        self.disconnect().await;
        info!(session_id, ?outcome, "AI player stopped");
        outcome
    }

    async fn run(&mut self, session_id: &str) -> SessionOutcome {
        let mut session = SessionState::new(self.side, self.layout);
        let mut stop_rx = self.stop_rx.clone();

        if let Err(e) = self.send_message(&ClientMessage::Ping).await {
            warn!(session_id, error = %e, "Initial ping failed");
            return SessionOutcome::ConnectionLost;
        }
        info!(session_id, policy = self.policy.name(), "AI player started, waiting for game state...");

        loop {
            if *stop_rx.borrow_and_update() {
                info!(session_id, "Stop requested");
                return SessionOutcome::Stopped;
            }
            if !self.is_connected() {
                return SessionOutcome::ConnectionLost;
            }

            let receive_timeout = self.receive_timeout;
            let Some(socket) = self.socket.as_mut() else {
                return SessionOutcome::ConnectionLost;
            };

            let received = tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        return SessionOutcome::Stopped;
                    }
                    continue;
                }
                received = timeout(receive_timeout, socket.next()) => received,
            };

            let frame = match received {
                Err(_) => {
                    debug!(session_id, "Timeout, sending ping");
                    if let Err(e) = self.send_message(&ClientMessage::Ping).await {
                        warn!(session_id, error = %e, "Keepalive ping failed");
                        return SessionOutcome::ConnectionLost;
                    }
                    continue;
                }
                Ok(None) => {
                    info!(session_id, "Connection ended by server");
                    self.state = ConnectionState::Closed;
                    return SessionOutcome::ConnectionLost;
                }
                Ok(Some(Err(e))) => {
                    warn!(session_id, error = %e, "Receive failed");
                    self.state = ConnectionState::Closed;
                    return SessionOutcome::ConnectionLost;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(close) => {
                    info!(session_id, ?close, "Server closed the connection");
                    self.state = ConnectionState::Closed;
                    return SessionOutcome::ConnectionLost;
                }
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            let message = match ServerMessage::decode(&text) {
                Ok(message) => message,
                Err(e) => {
                    error!(session_id, error = %e, frame = %text, "Error in game loop");
                    return SessionOutcome::ProtocolError(e.to_string());
                }
            };

            let step = session.on_message(&message, self.policy.as_mut());

            if let Some(outbound) = step.outbound {
                let sent = match outbound {
                    ClientMessage::Paddle { direction, .. } => self.send_command(direction).await,
                    other => self.send_message(&other).await,
                };
                if let Err(e) = sent {
                    warn!(session_id, error = %e, "Send failed");
                    return SessionOutcome::ConnectionLost;
                }
            }

            if let Some(outcome) = step.end {
                return outcome;
            }
        }
    }
}

async fn open_socket(url: &str, connect_timeout: Duration) -> Result<WsStream, ClientError> {
    match timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((socket, _response))) => Ok(socket),
        Ok(Err(source)) => Err(ClientError::Connect {
            url: url.to_string(),
            source,
        }),
        Err(_) => Err(ClientError::ConnectTimeout {
            url: url.to_string(),
            timeout_ms: connect_timeout.as_millis() as u64,
        }),
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic in play loop".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::Scores;
    use crate::network::test_support::{spawn_game_server, Script};
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a fixed direction and records every observation
    struct FixedPolicy {
        direction: Direction,
        layout: ObservationLayout,
        seen: Arc<Mutex<Vec<Vec<f32>>>>,
    }

    impl Policy for FixedPolicy {
        fn decide(&mut self, observation: &[f32]) -> Direction {
            self.seen.lock().unwrap().push(observation.to_vec());
            self.direction
        }

        fn layout(&self) -> ObservationLayout {
            self.layout
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct PanickingPolicy;

    impl Policy for PanickingPolicy {
        fn decide(&mut self, _observation: &[f32]) -> Direction {
            panic!("policy exploded");
        }

        fn layout(&self) -> ObservationLayout {
            ObservationLayout::Full
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn config(base_url: &str) -> ClientConfig {
        ClientConfig {
            game_service_url: base_url.to_string(),
            receive_timeout_ms: 5000,
            connect_timeout_ms: 2000,
            ..ClientConfig::default()
        }
    }

    fn client(base_url: &str, direction: Direction) -> (GameClient, Arc<Mutex<Vec<Vec<f32>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let policy = FixedPolicy {
            direction,
            layout: ObservationLayout::Full,
            seen: seen.clone(),
        };
        let client = GameClient::new(&config(base_url), Box::new(policy)).unwrap();
        (client, seen)
    }

    fn playing() -> serde_json::Value {
        json!({"type": "state", "data": {
            "status": "playing",
            "ball": {"x": 10, "y": 20},
            "paddles": {"left": {"y": 0, "height": 100}, "right": {"y": 250, "height": 100}}
        }})
    }

    #[test]
    fn test_session_url() {
        assert_eq!(session_url("ws://game-service:3003", "abc"), "ws://game-service:3003/abc");
        assert_eq!(session_url("ws://game-service:3003/", "abc"), "ws://game-service:3003/abc");
    }

    #[test]
    fn test_layout_mismatch_is_rejected() {
        let policy = FixedPolicy {
            direction: Direction::Stop,
            layout: ObservationLayout::Reduced,
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let result = GameClient::new(&ClientConfig::default(), Box::new(policy));
        assert!(matches!(result, Err(ClientError::LayoutMismatch { .. })));
    }

    #[tokio::test]
    async fn test_full_session_sends_start_once_and_deduplicates_paddle() {
        let (url, recording) = spawn_game_server(vec![
            Script::Receive,
            Script::Send(json!({"type": "connected", "sessionId": "s1"})),
            Script::Send(json!({"type": "state", "data": {"status": "waiting"}})),
            Script::Send(json!({"type": "state", "data": {"status": "waiting"}})),
            Script::Send(playing()),
            Script::Send(playing()),
            Script::Send(json!({"type": "gameOver"})),
        ])
        .await;
        let (mut client, seen) = client(&url, Direction::Up);

        let outcome = client.play("s1").await;
        assert_eq!(outcome, SessionOutcome::GameOver);
        assert_eq!(client.state(), ConnectionState::Closed);

        let recording = recording.await.unwrap();
        assert_eq!(
            recording.texts,
            vec![
                json!({"type": "ping"}),
                json!({"type": "start"}),
                json!({"type": "paddle", "paddle": "right", "direction": "up"}),
            ]
        );
        assert_eq!(recording.close_frames, 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                vec![10.0, 20.0, 0.0, 0.0, 50.0, 300.0],
                vec![10.0, 20.0, 0.0, 0.0, 50.0, 300.0],
            ]
        );

        // Second disconnect is a no-op
        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_finished_status_ends_session() {
        let (url, recording) = spawn_game_server(vec![
            Script::Receive,
            Script::Send(json!({"type": "state", "data": {"status": "finished", "scores": {"left": 2, "right": 5}}})),
        ])
        .await;
        let (mut client, _) = client(&url, Direction::Stop);

        let outcome = client.play("s1").await;
        assert_eq!(outcome, SessionOutcome::Finished(Scores { left: 2, right: 5 }));

        let recording = recording.await.unwrap();
        assert_eq!(recording.texts, vec![json!({"type": "ping"})]);
        assert_eq!(recording.close_frames, 1);
    }

    #[tokio::test]
    async fn test_server_error_ends_session() {
        let (url, recording) = spawn_game_server(vec![
            Script::Receive,
            Script::Send(json!({"type": "error", "message": "No game at this session"})),
        ])
        .await;
        let (mut client, _) = client(&url, Direction::Stop);

        let outcome = client.play("missing").await;
        assert_eq!(
            outcome,
            SessionOutcome::ServerError("No game at this session".to_string())
        );
        assert_eq!(recording.await.unwrap().close_frames, 1);
    }

    #[tokio::test]
    async fn test_unparseable_frame_aborts_and_disconnects() {
        let (url, recording) = spawn_game_server(vec![
            Script::Receive,
            Script::SendRaw("{not json".to_string()),
            Script::Send(json!({"type": "gameOver"})),
        ])
        .await;
        let (mut client, _) = client(&url, Direction::Stop);

        let outcome = client.play("s1").await;
        assert!(matches!(outcome, SessionOutcome::ProtocolError(_)));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(recording.await.unwrap().close_frames, 1);
    }

    #[tokio::test]
    async fn test_mistyped_field_does_not_end_session() {
        let (url, _recording) = spawn_game_server(vec![
            Script::Receive,
            Script::Send(json!({"type": "connected", "sessionId": 42})),
            Script::Send(json!({"type": "gameOver"})),
        ])
        .await;
        let (mut client, _) = client(&url, Direction::Stop);

        assert_eq!(client.play("s1").await, SessionOutcome::GameOver);
    }

    #[tokio::test]
    async fn test_unknown_message_is_skipped() {
        let (url, _recording) = spawn_game_server(vec![
            Script::Receive,
            Script::Send(json!({"type": "spectate"})),
            Script::Send(json!({"type": "pong"})),
            Script::Send(json!({"type": "gameOver"})),
        ])
        .await;
        let (mut client, _) = client(&url, Direction::Stop);

        assert_eq!(client.play("s1").await, SessionOutcome::GameOver);
    }

    #[tokio::test]
    async fn test_receive_timeout_sends_one_keepalive_ping() {
        let (url, recording) = spawn_game_server(vec![
            Script::Receive,
            Script::Receive,
            Script::Send(json!({"type": "gameOver"})),
        ])
        .await;
        let (mut client, _) = client(&url, Direction::Stop);
        client.receive_timeout = Duration::from_millis(300);

        assert_eq!(client.play("s1").await, SessionOutcome::GameOver);
        assert_eq!(
            recording.await.unwrap().texts,
            vec![json!({"type": "ping"}), json!({"type": "ping"})]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_skips_loop() {
        // Reserve a port, then free it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (mut client, seen) = client(&format!("ws://{}", addr), Direction::Up);

        assert!(!client.connect("s1").await);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        assert_eq!(client.play("s1").await, SessionOutcome::ConnectFailed);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(seen.lock().unwrap().is_empty());

        // Never connected: disconnect and send are harmless
        client.disconnect().await;
        client.send_command(Direction::Down).await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_stop_ends_waiting_loop() {
        let (url, recording) = spawn_game_server(vec![Script::Receive]).await;
        let (mut client, _) = client(&url, Direction::Stop);
        client.receive_timeout = Duration::from_secs(30);

        let handle = client.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.stop();
        });

        let outcome = tokio::time::timeout(Duration::from_secs(5), client.play("s1"))
            .await
            .expect("stop was not observed");
        assert_eq!(outcome, SessionOutcome::Stopped);
        assert!(client.stop_handle().is_stopped());

        let recording = recording.await.unwrap();
        assert_eq!(recording.texts, vec![json!({"type": "ping"})]);
        assert_eq!(recording.close_frames, 1);
    }

    #[tokio::test]
    async fn test_server_close_reports_connection_lost() {
        let (url, _recording) = spawn_game_server(vec![Script::Receive, Script::Close]).await;
        let (mut client, _) = client(&url, Direction::Stop);

        assert_eq!(client.play("s1").await, SessionOutcome::ConnectionLost);
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_policy_panic_is_contained() {
        let (url, recording) = spawn_game_server(vec![Script::Receive, Script::Send(playing())]).await;
        let mut client = GameClient::new(&config(&url), Box::new(PanickingPolicy)).unwrap();

        let outcome = client.play("s1").await;
        assert_eq!(outcome, SessionOutcome::Aborted("policy exploded".to_string()));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(recording.await.unwrap().close_frames, 1);
    }
}
