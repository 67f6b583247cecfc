//! WebSocket background loops.
//!
//! Responsibilities:
//! - Reader: decode-once, narrow, route to the auth slot or the delivery queue
//! - Monitor: periodic ping with a per-probe timeout
//! - Both end the session through [`Router::fatal`] instead of exiting the
//!   process, so the UI gets to show why

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;

use matechat_core::error::{MateChatError, Severity};
use matechat_core::protocol::ServerMsg;

use crate::dispatch::Router;
use crate::transport::codec::{decode, Inbound};
use crate::transport::FrameSink;

/// Inbound reader loop. Runs until the transport fails or the session loop
/// goes away; never reconnects.
pub async fn run_reader<St, E>(mut stream: St, router: Router, sink: Arc<dyn FrameSink>)
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let reason = loop {
        let Some(incoming) = stream.next().await else {
            break MateChatError::ConnectionLost("server closed the stream".into());
        };
        let msg = match incoming {
            Ok(msg) => msg,
            Err(e) => break MateChatError::ConnectionLost(format!("read failed: {e}")),
        };

        let (env, bytes_len) = match decode(msg) {
            Ok(Inbound::Text { env, bytes_len }) => (env, bytes_len),
            Ok(Inbound::Control) => continue,
            Ok(Inbound::Ignored { bytes_len }) => {
                tracing::debug!(bytes_len, "non-text frame ignored");
                continue;
            }
            Ok(Inbound::Close) => {
                break MateChatError::ConnectionLost("server closed the connection".into())
            }
            Err(e) => break e,
        };

        let msg = match ServerMsg::from_envelope(&env) {
            Ok(msg) => msg,
            Err(MateChatError::UnknownType(ty)) => {
                tracing::debug!(msg_type = %ty, bytes_len, "unknown envelope type ignored");
                continue;
            }
            Err(e) if e.severity() == Severity::Recoverable => {
                tracing::warn!(msg_type = %env.msg_type, error = %e, "malformed envelope dropped");
                continue;
            }
            Err(e) => break e,
        };

        tracing::debug!(msg_type = msg.msg_type(), bytes_len, "inbound");
        if router.route(msg).await.is_err() {
            tracing::debug!("session loop gone, reader stopping");
            return;
        }
    };

    tracing::error!(error = %reason, "inbound reader stopped");
    sink.close().await;
    router.fatal(reason).await;
}

/// Liveness monitor loop. The first probe goes out immediately.
pub async fn run_monitor(
    sink: Arc<dyn FrameSink>,
    router: Router,
    every: Duration,
    probe_timeout: Duration,
) {
    let mut tick = tokio::time::interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tick.tick().await;
        match tokio::time::timeout(probe_timeout, sink.send_frame(Message::Ping(Vec::new()))).await {
            Ok(Ok(())) => tracing::trace!("liveness probe sent"),
            Ok(Err(e)) => break MateChatError::ProbeFailed(e.to_string()),
            Err(_) => {
                break MateChatError::ProbeFailed(format!(
                    "no write within {}ms",
                    probe_timeout.as_millis()
                ))
            }
        }
    };

    tracing::error!(error = %reason, "liveness monitor stopped");
    router.fatal(reason).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Delivery, PendingAuth};
    use crate::transport::SharedSink;
    use futures::channel::mpsc as fmpsc;
    use futures::stream;
    use matechat_core::protocol::AuthReply;
    use tokio::sync::mpsc;

    fn text(s: &str) -> Result<Message, std::io::Error> {
        Ok(Message::Text(s.into()))
    }

    fn harness(capacity: usize) -> (Router, mpsc::Receiver<Delivery>, PendingAuth) {
        let (tx, rx) = mpsc::channel(capacity);
        let auth = PendingAuth::new();
        (Router::new(tx, auth.clone()), rx, auth)
    }

    async fn drain(rx: &mut mpsc::Receiver<Delivery>) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Some(d) = rx.recv().await {
            let fatal = matches!(d, Delivery::Fatal(_));
            out.push(d);
            if fatal {
                break;
            }
        }
        out
    }

    #[tokio::test]
    async fn junk_types_and_payloads_do_not_stop_the_reader() {
        let (router, mut rx, _auth) = harness(16);
        let (sink_tx, _sink_rx) = fmpsc::unbounded::<Message>();
        let frames = stream::iter(vec![
            text(r#"{"Type":"Chat","Data":"one"}"#),
            text(r#"{"Type":"Serenade","Data":"la"}"#),
            text(r#"{"Type":"InviteRequest","Data":{"who":"bob"}}"#),
            Ok(Message::Binary(vec![1, 2, 3])),
            Ok(Message::Pong(Vec::new())),
            text(r#"{"Type":"OnlineUsers","Data":7}"#),
            text(r#"{"Type":"Chat","Data":"two"}"#),
        ]);

        run_reader(frames, router, Arc::new(SharedSink::new(sink_tx))).await;

        let got = drain(&mut rx).await;
        assert_eq!(got.len(), 3);
        assert!(matches!(&got[0], Delivery::Message(ServerMsg::Chat { text }) if text == "one"));
        assert!(matches!(&got[1], Delivery::Message(ServerMsg::Chat { text }) if text == "two"));
        assert!(matches!(&got[2], Delivery::Fatal(MateChatError::ConnectionLost(_))));
    }

    #[tokio::test]
    async fn undecodable_frame_is_connection_loss() {
        let (router, mut rx, _auth) = harness(4);
        let (sink_tx, mut sink_rx) = fmpsc::unbounded::<Message>();
        let frames = stream::iter(vec![
            text("not json"),
            text(r#"{"Type":"Chat","Data":"never seen"}"#),
        ]);

        run_reader(frames, router, Arc::new(SharedSink::new(sink_tx))).await;

        let got = drain(&mut rx).await;
        assert_eq!(got.len(), 1);
        assert!(matches!(&got[0], Delivery::Fatal(MateChatError::InvalidEnvelope(_))));
        // Transport closed.
        assert_eq!(sink_rx.next().await, None);
    }

    #[tokio::test]
    async fn read_error_and_close_frame_end_the_session() {
        for frames in [
            vec![Err(std::io::Error::other("reset"))],
            vec![Ok(Message::Close(None))],
        ] {
            let (router, mut rx, _auth) = harness(4);
            let (sink_tx, _sink_rx) = fmpsc::unbounded::<Message>();
            run_reader(stream::iter(frames), router, Arc::new(SharedSink::new(sink_tx))).await;
            assert!(matches!(
                drain(&mut rx).await.as_slice(),
                [Delivery::Fatal(MateChatError::ConnectionLost(_))]
            ));
        }
    }

    #[tokio::test]
    async fn auth_reply_skips_the_queue_when_awaited() {
        let (router, mut rx, auth) = harness(4);
        let ticket = auth.open().await.unwrap();
        let (sink_tx, _sink_rx) = fmpsc::unbounded::<Message>();
        let frames = stream::iter(vec![
            text(r#"{"Type":"OnlineUsers","Data":"bob"}"#),
            text(r#"{"Type":"UserExist","Data":null}"#),
        ]);

        run_reader(frames, router, Arc::new(SharedSink::new(sink_tx))).await;

        assert_eq!(
            ticket.wait(Duration::from_secs(1)).await,
            crate::session::AuthOutcome::Reply(AuthReply::UserExist)
        );
        let got = drain(&mut rx).await;
        assert!(matches!(&got[0], Delivery::Message(ServerMsg::OnlineUsers { .. })));
        assert!(matches!(&got[1], Delivery::Fatal(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_pings_until_the_write_fails() {
        let (router, mut rx, _auth) = harness(4);
        let (sink_tx, mut sink_rx) = fmpsc::unbounded::<Message>();
        let sink: Arc<dyn FrameSink> = Arc::new(SharedSink::new(sink_tx));

        let monitor = tokio::spawn(run_monitor(
            Arc::clone(&sink),
            router,
            Duration::from_secs(60),
            Duration::from_secs(5),
        ));

        assert_eq!(sink_rx.next().await, Some(Message::Ping(Vec::new())));
        assert_eq!(sink_rx.next().await, Some(Message::Ping(Vec::new())));
        drop(sink_rx);

        assert!(matches!(
            rx.recv().await,
            Some(Delivery::Fatal(MateChatError::ProbeFailed(_)))
        ));
        monitor.await.unwrap();
    }
}
