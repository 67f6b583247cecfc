//! Serialized transport writer.
//!
//! The liveness monitor and the session loop both write to the same
//! connection, so every write goes through one async lock.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use matechat_core::error::{MateChatError, Result};
use matechat_core::protocol::ClientMsg;

use crate::transport::codec;

/// Write half of the transport, shared across tasks.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_frame(&self, frame: Message) -> Result<()>;
    async fn close(&self);
}

/// Any `Sink<Message>` behind a single writer lock.
pub struct SharedSink<S> {
    inner: Mutex<S>,
}

impl<S> SharedSink<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl<S> FrameSink for SharedSink<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display + Send,
{
    async fn send_frame(&self, frame: Message) -> Result<()> {
        let mut sink = self.inner.lock().await;
        sink.send(frame)
            .await
            .map_err(|e| MateChatError::Send(e.to_string()))
    }

    async fn close(&self) {
        let mut sink = self.inner.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!(error = %e, "transport close failed");
        }
    }
}

/// Outbound sender: encodes client messages and writes them.
///
/// Errors are logged and returned; the caller decides what the user sees.
#[derive(Clone)]
pub struct Outbound {
    sink: Arc<dyn FrameSink>,
}

impl Outbound {
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self { sink }
    }

    pub async fn send(&self, msg: &ClientMsg) -> Result<()> {
        let frame = codec::encode(msg)?;
        match self.sink.send_frame(frame).await {
            Ok(()) => {
                tracing::debug!(msg_type = msg.msg_type(), "sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(msg_type = msg.msg_type(), error = %e, "send failed");
                Err(e)
            }
        }
    }

    /// Close the transport (sends a close frame on a websocket).
    pub async fn close(&self) {
        self.sink.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::StreamExt;

    #[tokio::test]
    async fn outbound_writes_encoded_text() {
        let (tx, mut rx) = mpsc::unbounded::<Message>();
        let out = Outbound::new(Arc::new(SharedSink::new(tx)));

        out.send(&ClientMsg::Chat { text: "hi".into() }).await.unwrap();

        assert_eq!(
            rx.next().await,
            Some(Message::Text(r#"{"Type":"Chat","Data":"hi"}"#.into()))
        );
    }

    #[tokio::test]
    async fn write_failure_is_returned_not_fatal() {
        let (tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);
        let out = Outbound::new(Arc::new(SharedSink::new(tx)));

        let err = out
            .send(&ClientMsg::Invite { target: "bob".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, MateChatError::Send(_)));
        assert_eq!(err.severity(), matechat_core::Severity::Recoverable);
    }

    #[tokio::test]
    async fn closed_sink_rejects_writes() {
        let (tx, _rx) = mpsc::unbounded::<Message>();
        let sink = SharedSink::new(tx);
        sink.close().await;
        assert!(sink.send_frame(Message::Ping(Vec::new())).await.is_err());
    }
}
