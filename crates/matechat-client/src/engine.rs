//! Connection-scoped engine state.
//!
//! Owns everything the session loop shares with the background tasks: the
//! serialized writer, the delivery queue, the auth reply slot, and the
//! reader/monitor task handles. Nothing here is global; dropping the engine
//! stops both tasks.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use matechat_core::error::{MateChatError, Result};
use matechat_core::protocol::ClientMsg;

use crate::config::ClientConfig;
use crate::dispatch::{AuthTicket, Delivery, PendingAuth, Router};
use crate::transport::ws::{run_monitor, run_reader};
use crate::transport::{FrameSink, Outbound, SharedSink};

pub struct Engine {
    outbound: Outbound,
    auth: PendingAuth,
    deliveries: mpsc::Receiver<Delivery>,
    auth_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Dial the server and start the background tasks.
    pub async fn connect(cfg: &ClientConfig, url: &str) -> Result<Self> {
        let (ws, _resp) = tokio::time::timeout(
            cfg.connection.connect_timeout(),
            tokio_tungstenite::connect_async(url),
        )
        .await
        .map_err(|_| MateChatError::ConnectionLost(format!("connect to {url} timed out")))?
        .map_err(|e| MateChatError::ConnectionLost(format!("connect to {url} failed: {e}")))?;

        tracing::info!(%url, "connected");
        let (sink, stream) = ws.split();
        Ok(Self::start(cfg, sink, stream))
    }

    /// Start the reader and monitor over an already connected transport.
    pub fn start<Si, St, E>(cfg: &ClientConfig, sink: Si, stream: St) -> Self
    where
        Si: Sink<Message> + Unpin + Send + 'static,
        Si::Error: Display + Send,
        St: Stream<Item = std::result::Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let sink: Arc<dyn FrameSink> = Arc::new(SharedSink::new(sink));
        let (tx, deliveries) = mpsc::channel(cfg.session.delivery_queue_capacity.max(1));
        let auth = PendingAuth::new();
        let router = Router::new(tx, auth.clone());

        let reader = tokio::spawn(run_reader(stream, router.clone(), Arc::clone(&sink)));
        let monitor = tokio::spawn(run_monitor(
            Arc::clone(&sink),
            router,
            cfg.liveness.ping_interval(),
            cfg.liveness.probe_timeout(),
        ));

        Self {
            outbound: Outbound::new(sink),
            auth,
            deliveries,
            auth_timeout: cfg.session.auth_timeout(),
            tasks: vec![reader, monitor],
        }
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }

    /// Next item from the delivery queue.
    pub async fn next_delivery(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    /// Open the reply slot, then send. The slot is opened first so a fast
    /// reply cannot slip past it.
    pub async fn begin_auth(&self, msg: &ClientMsg) -> Result<AuthTicket> {
        if !msg.expects_auth_reply() {
            return Err(MateChatError::Internal(format!(
                "{} does not expect an auth reply",
                msg.msg_type()
            )));
        }
        let ticket = self.auth.open().await?;
        tracing::debug!(request_id = ticket.id, msg_type = msg.msg_type(), "auth request");
        if let Err(e) = self.outbound.send(msg).await {
            self.auth.cancel(ticket.id).await;
            return Err(e);
        }
        Ok(ticket)
    }

    /// Close the transport on a user quit. The tasks stop on drop.
    pub async fn shutdown(&self) {
        tracing::info!("closing connection");
        self.outbound.close().await;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Build the server URL from the positional argument.
///
/// A bare `host:port` becomes `ws://host:port<path>`; a full `ws://` or
/// `wss://` URL is used unchanged.
pub fn server_url(endpoint: &str, path: &str) -> String {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}{path}")
    }
}
