use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};

use matechat_core::error::{MateChatError, Result};
use matechat_core::protocol::{AuthReply, ServerMsg};

use crate::session::AuthOutcome;

/// One item on the delivery queue.
#[derive(Debug)]
pub enum Delivery {
    Message(ServerMsg),
    /// The transport is gone; nothing further will arrive.
    Fatal(MateChatError),
}

/// Single reply slot for the in-flight `Register`/`Login`.
///
/// Auth replies are matched here instead of on the delivery queue, so an
/// unrelated event arriving first can never be taken for the reply. A request
/// that timed out still owes a reply; that many replies are discarded before
/// the next waiter is served.
#[derive(Clone, Default)]
pub struct PendingAuth {
    inner: Arc<AuthSlot>,
}

#[derive(Default)]
struct AuthSlot {
    state: Mutex<SlotState>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct SlotState {
    waiter: Option<(u64, oneshot::Sender<AuthReply>)>,
    /// Replies still owed to expired requests.
    stale: usize,
}

impl PendingAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the slot. Fails while another request is still waiting.
    pub async fn open(&self) -> Result<AuthTicket> {
        let mut state = self.inner.state.lock().await;
        if let Some((id, tx)) = state.waiter.as_ref() {
            if !tx.is_closed() {
                return Err(MateChatError::Internal(format!(
                    "auth request {id} still pending"
                )));
            }
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        state.waiter = Some((id, tx));
        Ok(AuthTicket {
            id,
            reply: rx,
            slot: self.clone(),
        })
    }

    /// Hand a reply to the waiter. Returns the reply back if nobody waits.
    pub async fn resolve(&self, reply: AuthReply) -> Option<AuthReply> {
        let mut state = self.inner.state.lock().await;
        if state.stale > 0 {
            state.stale -= 1;
            tracing::warn!(
                reply = reply.as_str(),
                still_owed = state.stale,
                "late auth reply discarded"
            );
            return None;
        }
        match state.waiter.take() {
            Some((id, tx)) => match tx.send(reply) {
                Ok(()) => {
                    tracing::debug!(request_id = id, reply = reply.as_str(), "auth reply matched");
                    None
                }
                Err(reply) => Some(reply),
            },
            None => Some(reply),
        }
    }

    /// Drop the waiter for `id` whose request never reached the server.
    pub async fn cancel(&self, id: u64) {
        let mut state = self.inner.state.lock().await;
        if matches!(state.waiter.as_ref(), Some((current, _)) if *current == id) {
            state.waiter = None;
        }
    }

    /// Drop the waiter for `id` after a timeout. Its reply may still come
    /// and must not resolve a later request.
    async fn expire(&self, id: u64) {
        let mut state = self.inner.state.lock().await;
        if matches!(state.waiter.as_ref(), Some((current, _)) if *current == id) {
            state.waiter = None;
            state.stale += 1;
        }
    }

    /// Drop any waiter; it observes [`AuthOutcome::Abandoned`]. Nothing is
    /// owed any more once the transport is gone.
    pub async fn abandon(&self) {
        let mut state = self.inner.state.lock().await;
        state.waiter = None;
        state.stale = 0;
    }

    /// A live waiter holds the slot. A dropped ticket does not count.
    pub async fn is_pending(&self) -> bool {
        let state = self.inner.state.lock().await;
        matches!(state.waiter.as_ref(), Some((_, tx)) if !tx.is_closed())
    }
}

/// Receiving end of one auth request.
pub struct AuthTicket {
    pub id: u64,
    reply: oneshot::Receiver<AuthReply>,
    slot: PendingAuth,
}

impl AuthTicket {
    /// Wait for the paired reply, at most `limit`.
    pub async fn wait(self, limit: Duration) -> AuthOutcome {
        match tokio::time::timeout(limit, self.reply).await {
            Ok(Ok(reply)) => AuthOutcome::Reply(reply),
            Ok(Err(_)) => AuthOutcome::Abandoned,
            Err(_) => {
                tracing::warn!(request_id = self.id, "auth reply timed out");
                self.slot.expire(self.id).await;
                AuthOutcome::TimedOut
            }
        }
    }
}

/// Routes narrowed server messages to the auth slot or the delivery queue.
#[derive(Clone)]
pub struct Router {
    events: mpsc::Sender<Delivery>,
    auth: PendingAuth,
}

impl Router {
    pub fn new(events: mpsc::Sender<Delivery>, auth: PendingAuth) -> Self {
        Self { events, auth }
    }

    /// Route one message. Waits for queue capacity when the queue is full.
    /// Fails only when the session loop is gone.
    pub async fn route(&self, msg: ServerMsg) -> Result<()> {
        let msg = match msg {
            ServerMsg::Auth(reply) => match self.auth.resolve(reply).await {
                None => return Ok(()),
                Some(unsolicited) => {
                    tracing::warn!(reply = unsolicited.as_str(), "auth reply without a pending request");
                    ServerMsg::Auth(unsolicited)
                }
            },
            other => other,
        };
        self.events
            .send(Delivery::Message(msg))
            .await
            .map_err(|_| MateChatError::Internal("delivery queue closed".into()))
    }

    /// Signal the end of the session: releases any auth waiter, then queues
    /// the fatal error behind everything already delivered.
    pub async fn fatal(&self, err: MateChatError) {
        self.auth.abandon().await;
        if self.events.send(Delivery::Fatal(err)).await.is_err() {
            tracing::debug!("session loop already gone");
        }
    }
}
