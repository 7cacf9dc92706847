//! Connection abstraction.
//!
//! The manager only needs to accept, write text and close; anything that
//! can do that can be registered. [`SocketConnection`] adapts an axum
//! WebSocket.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::SinkExt;
use futures::StreamExt;
use futures::stream::{SplitSink, SplitStream};
use tokio::sync::Mutex;

use crate::error::{RuntimeError, RuntimeResult};

/// A client connection the manager can address.
pub trait Connection: Send + Sync + 'static {
    /// Complete the handshake.
    fn accept(&self) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Send one text frame.
    fn send_text(&self, text: &str) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Close with a status code and reason.
    fn close(&self, code: u16, reason: &str) -> impl Future<Output = RuntimeResult<()>> + Send;
}

/// Write half of an axum WebSocket.
pub struct SocketConnection {
    sender: Mutex<SplitSink<WebSocket, Message>>,
    closed: AtomicBool,
}

impl SocketConnection {
    /// Split an upgraded socket into a registrable connection and its
    /// incoming message stream.
    pub fn split(socket: WebSocket) -> (Self, SplitStream<WebSocket>) {
        let (sender, receiver) = socket.split();
        let conn = Self {
            sender: Mutex::new(sender),
            closed: AtomicBool::new(false),
        };
        (conn, receiver)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn send_frame(&self, message: Message) -> RuntimeResult<()> {
        if self.is_closed() {
            return Err(RuntimeError::Closed);
        }
        let mut sender = self.sender.lock().await;
        sender
            .send(message)
            .await
            .map_err(|e| RuntimeError::Send(e.to_string()))
    }
}

impl Connection for SocketConnection {
    /// axum completes the handshake before the upgrade callback runs.
    async fn accept(&self) -> RuntimeResult<()> {
        Ok(())
    }

    async fn send_text(&self, text: &str) -> RuntimeResult<()> {
        self.send_frame(Message::Text(text.to_owned().into())).await
    }

    async fn close(&self, code: u16, reason: &str) -> RuntimeResult<()> {
        let frame = CloseFrame {
            code,
            reason: reason.to_owned().into(),
        };
        let result = self.send_frame(Message::Close(Some(frame))).await;
        self.closed.store(true, Ordering::Release);
        result
    }
}
