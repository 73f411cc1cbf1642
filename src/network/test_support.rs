// Scripted loopback game server for client tests

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// One step of the server script
pub(crate) enum Script {
    /// Wait for the next text frame from the client
    Receive,
    /// Send a JSON message
    Send(Value),
    /// Send a text frame verbatim
    SendRaw(String),
    /// Start the close handshake
    Close,
}

/// What the server saw from the client
#[derive(Debug, Default)]
pub(crate) struct Recording {
    pub texts: Vec<Value>,
    pub close_frames: usize,
}

impl Recording {
    fn record(&mut self, message: Message) -> bool {
        match message {
            Message::Text(text) => {
                self.texts
                    .push(serde_json::from_str(&text).unwrap_or(Value::String(text)));
                true
            }
            Message::Close(_) => {
                self.close_frames += 1;
                false
            }
            _ => false,
        }
    }
}

/// Accept one WebSocket connection, run `script`, then keep reading until
/// the client goes away. Returns the base URL and the final recording.
pub(crate) async fn spawn_game_server(script: Vec<Script>) -> (String, oneshot::Receiver<Recording>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut recording = Recording::default();

        for step in script {
            match step {
                Script::Receive => loop {
                    match ws.next().await {
                        Some(Ok(message)) => {
                            if recording.record(message) {
                                break;
                            }
                        }
                        _ => break,
                    }
                },
                Script::Send(value) => {
                    let _ = ws.send(Message::Text(value.to_string())).await;
                }
                Script::SendRaw(text) => {
                    let _ = ws.send(Message::Text(text)).await;
                }
                Script::Close => {
                    let _ = ws.close(None).await;
                }
            }
        }

        while let Some(Ok(message)) = ws.next().await {
            recording.record(message);
        }
        let _ = done_tx.send(recording);
    });

    (format!("ws://{}", addr), done_rx)
}
