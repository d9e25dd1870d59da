use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::client::config::ClientConfig;
use crate::common::protocol::{encode, ClientCommand};

pub const DISCONNECTED_NOTICE: &str = "You're disconnected. Reconnecting...";

#[derive(Debug, Error)]
pub enum WebSocketError {
    #[error("Invalid board url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What the connection reports back to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    /// One raw text frame, in receipt order.
    Message(String),
    Disconnected { reason: String },
    Reconnecting { delay: Duration },
}

/// `ws://host/board/ws?u=<name>`, or `wss://` when `secure`.
pub fn board_url(host: &str, path: &str, username: &str, secure: bool) -> Result<Url, WebSocketError> {
    let scheme = if secure { "wss" } else { "ws" };
    let path = path.trim_matches('/');
    let base = if path.is_empty() {
        format!("{scheme}://{host}/ws")
    } else {
        format!("{scheme}://{host}/{path}/ws")
    };
    let mut url = Url::parse(&base)?;
    url.query_pairs_mut().append_pair("u", username);
    Ok(url)
}

enum SessionEnd {
    Closed(String),
    Shutdown,
}

/// Keeps one websocket to the board alive. A dropped connection is retried
/// after a fixed delay, forever, until shutdown is signalled.
pub struct WebSocketClient {
    url: Url,
    reconnect_delay: Duration,
}

impl WebSocketClient {
    pub fn new(url: Url, reconnect_delay: Duration) -> Self {
        Self { url, reconnect_delay }
    }

    pub fn from_config(config: &ClientConfig, username: &str) -> Result<Self, WebSocketError> {
        let url = board_url(&config.host, &config.path, username, config.secure)?;
        Ok(Self::new(url, config.reconnect_delay))
    }

    /// Runs until `shutdown` flips to `true`, the shutdown sender is dropped,
    /// or the application stops listening. Commands queued while no socket is
    /// open are dropped, not buffered.
    pub async fn run(
        self,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        mut outgoing: mpsc::UnboundedReceiver<ClientCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let reason = match self.session(&events, &mut outgoing, &mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed(reason)) => reason,
                Err(e) => e.to_string(),
            };
            warn!("[WS:CLIENT] disconnected: {}", reason);
            if events.send(ConnectionEvent::Disconnected { reason }).is_err() {
                break;
            }
            let _ = events.send(ConnectionEvent::Reconnecting {
                delay: self.reconnect_delay,
            });
            info!("[WS:CLIENT] Retrying in {:?}...", self.reconnect_delay);

            let pause = tokio::time::sleep(self.reconnect_delay);
            tokio::pin!(pause);
            loop {
                tokio::select! {
                    _ = &mut pause => break,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return;
                        }
                    }
                    command = outgoing.recv() => match command {
                        Some(command) => warn!("[WS:CLIENT] not connected, dropping {}", command.kind()),
                        None => return,
                    },
                }
            }
        }
        debug!("[WS:CLIENT] connection loop ended");
    }

    async fn session(
        &self,
        events: &mpsc::UnboundedSender<ConnectionEvent>,
        outgoing: &mut mpsc::UnboundedReceiver<ClientCommand>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, WebSocketError> {
        info!("[WS:CLIENT] Connecting to {}", self.url);
        let connecting = connect_async(self.url.as_str());
        tokio::pin!(connecting);
        let ws_stream = loop {
            tokio::select! {
                connected = &mut connecting => {
                    break connected.map_err(|e| WebSocketError::ConnectionFailed(e.to_string()))?.0;
                }
                _ = shutdown.changed() => return Ok(SessionEnd::Shutdown),
                // no socket yet: same rule as while waiting to retry
                command = outgoing.recv() => match command {
                    Some(command) => warn!("[WS:CLIENT] not connected, dropping {}", command.kind()),
                    None => return Ok(SessionEnd::Shutdown),
                },
            }
        };
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        // identify first; the server answers with a `me` message
        ws_sender.send(Message::Text(encode(&ClientCommand::Me)?)).await?;
        info!("[WS:CLIENT] Connected to {}", self.url);
        if events.send(ConnectionEvent::Connected).is_err() {
            return Ok(SessionEnd::Shutdown);
        }

        loop {
            tokio::select! {
                frame = ws_receiver.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(ConnectionEvent::Message(text)).is_err() {
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                        return Ok(SessionEnd::Closed(reason));
                    }
                    // ping/pong are answered by tungstenite, binary is not part of the protocol
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(SessionEnd::Closed("connection closed".to_string())),
                },
                command = outgoing.recv() => match command {
                    Some(command) => {
                        debug!("[WS:CLIENT] sending {}", command.kind());
                        ws_sender.send(Message::Text(encode(&command)?)).await?;
                    }
                    None => {
                        let _ = ws_sender.close().await;
                        return Ok(SessionEnd::Shutdown);
                    }
                },
                _ = shutdown.changed() => {
                    let _ = ws_sender.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }
}
