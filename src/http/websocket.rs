//! WebSocket endpoint handling.
//!
//! # Responsibilities
//! - Define the lifecycle contract application handlers implement
//! - Drive a fresh handler per accepted connection
//! - Bridge outbound sends through a session handle
//!
//! # Data Flow
//! ```text
//! Client ── upgrade ──→ runtime (handshake)
//!     → factory creates one handler for the connection
//!     → on_open(session)
//!     → on_message per text/binary frame (ping/pong transparent)
//!     → on_close when either side closes
//! ```
//!
//! # Design Decisions
//! - One handler instance per connection, created by the registered factory
//! - Outbound frames go through a channel so the handler never holds the
//!   socket; a writer task owns the sink
//! - Close frames are propagated to `on_close` with code and reason

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

/// One inbound application-level frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// Handle for sending frames back on a live connection.
#[derive(Clone)]
pub struct WsSession {
    outbound: mpsc::UnboundedSender<Message>,
}

impl WsSession {
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self
            .outbound
            .send(Message::Text(Utf8Bytes::from(text.into())));
    }

    pub fn send_binary(&self, bytes: Vec<u8>) {
        let _ = self.outbound.send(Message::Binary(bytes.into()));
    }

    /// Ask the runtime to close the connection.
    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}

/// Lifecycle callbacks for one WebSocket connection.
pub trait WebSocketHandler: Send {
    fn on_open(&mut self, session: &WsSession) {
        let _ = session;
    }

    fn on_message(&mut self, session: &WsSession, message: WsMessage);

    fn on_close(&mut self, code: Option<u16>, reason: Option<String>) {
        let _ = (code, reason);
    }
}

/// Creates one handler per accepted connection.
pub trait WebSocketFactory: Send + Sync {
    fn create(&self) -> Box<dyn WebSocketHandler>;
}

impl<F> WebSocketFactory for F
where
    F: Fn() -> Box<dyn WebSocketHandler> + Send + Sync,
{
    fn create(&self) -> Box<dyn WebSocketHandler> {
        self()
    }
}

/// Drive a handler over an accepted socket until either side closes or the
/// idle timeout elapses without an inbound frame.
pub(crate) async fn drive(
    socket: WebSocket,
    mut handler: Box<dyn WebSocketHandler>,
    idle_timeout: Option<Duration>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let session = WsSession { outbound: tx };
    handler.on_open(&session);

    let mut close: Option<CloseFrame> = None;
    loop {
        let frame = match idle_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, stream.next()).await {
                Ok(frame) => frame,
                Err(_) => {
                    tracing::debug!("websocket idle timeout, closing connection");
                    session.close();
                    break;
                }
            },
            None => stream.next().await,
        };
        let Some(frame) = frame else { break };
        match frame {
            Ok(Message::Text(text)) => {
                handler.on_message(&session, WsMessage::Text(text.to_string()));
            }
            Ok(Message::Binary(bytes)) => {
                handler.on_message(&session, WsMessage::Binary(bytes.to_vec()));
            }
            Ok(Message::Close(frame)) => {
                close = frame;
                break;
            }
            // ping/pong handled by the runtime
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "websocket read failed");
                break;
            }
        }
    }

    handler.on_close(
        close.as_ref().map(|f| f.code),
        close.as_ref().map(|f| f.reason.to_string()),
    );

    // the handler may hold session clones; drop it so the writer task sees
    // the channel close
    drop(handler);
    drop(session);
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        opened: bool,
    }

    impl WebSocketHandler for Echo {
        fn on_open(&mut self, _session: &WsSession) {
            self.opened = true;
        }

        fn on_message(&mut self, session: &WsSession, message: WsMessage) {
            if let WsMessage::Text(text) = message {
                session.send_text(text);
            }
        }
    }

    #[test]
    fn factory_creates_fresh_handlers() {
        let factory = || Box::new(Echo { opened: false }) as Box<dyn WebSocketHandler>;
        let a = factory.create();
        let b = factory.create();
        drop((a, b));
    }

    #[tokio::test]
    async fn session_send_queues_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = WsSession { outbound: tx };
        session.send_text("hello");
        session.send_binary(vec![1, 2]);
        session.close();
        assert!(matches!(rx.recv().await, Some(Message::Text(t)) if t.as_str() == "hello"));
        assert!(matches!(rx.recv().await, Some(Message::Binary(_))));
        assert!(matches!(rx.recv().await, Some(Message::Close(None))));
    }
}
