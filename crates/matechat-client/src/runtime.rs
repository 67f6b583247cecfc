//! Session loop.
//!
//! The only place the [`Session`] record is mutated. Each iteration takes one
//! input (UI event, delivery, or auth outcome), applies it, executes the
//! resulting actions, and renders before looking at the next input.

use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;

use tokio::sync::{mpsc, watch};

use matechat_core::protocol::ClientMsg;
use matechat_core::MateChatError;

use crate::dispatch::Delivery;
use crate::engine::Engine;
use crate::session::{Action, AuthOutcome, Phase, Session, UiEvent};
use crate::surface::Surface;

type AuthWait = Pin<Box<dyn Future<Output = AuthOutcome> + Send>>;

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Quit,
    ConnectionLost(String),
}

pub struct Runtime<U> {
    engine: Engine,
    session: Session,
    surface: U,
    input: mpsc::Receiver<UiEvent>,
    phase: watch::Sender<Phase>,
    auth_wait: Option<AuthWait>,
}

impl<U: Surface> Runtime<U> {
    pub fn new(engine: Engine, surface: U, input: mpsc::Receiver<UiEvent>) -> Self {
        let session = Session::new();
        let (phase, _) = watch::channel(session.phase());
        Self {
            engine,
            session,
            surface,
            input,
            phase,
            auth_wait: None,
        }
    }

    /// Follows the phase after every step. The input task uses it to parse
    /// lines for the right prompt.
    pub fn phase_watch(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub async fn run(mut self) -> (Exit, Session) {
        self.render();

        let exit = loop {
            // The reader resolves an auth reply before it queues any later
            // frame, so polling the auth wait first keeps server order.
            let step = tokio::select! {
                biased;

                outcome = wait_auth(&mut self.auth_wait) => {
                    self.auth_wait = None;
                    let actions = self.session.handle_auth_outcome(outcome);
                    self.execute(actions).await
                }
                delivery = self.engine.next_delivery() => match delivery {
                    Some(Delivery::Message(msg)) => {
                        let actions = self.session.handle_server(msg);
                        self.execute(actions).await
                    }
                    Some(Delivery::Fatal(err)) => {
                        self.session.handle_fatal(&err);
                        ControlFlow::Break(Exit::ConnectionLost(err.to_string()))
                    }
                    None => {
                        let err = MateChatError::ConnectionLost("delivery queue closed".into());
                        self.session.handle_fatal(&err);
                        ControlFlow::Break(Exit::ConnectionLost(err.to_string()))
                    }
                },
                event = self.input.recv() => {
                    let actions = self.session.handle_ui(event.unwrap_or(UiEvent::Quit));
                    self.execute(actions).await
                }
            };

            self.render();
            if let ControlFlow::Break(exit) = step {
                break exit;
            }
        };

        if exit == Exit::Quit {
            self.engine.shutdown().await;
        }
        (exit, self.session)
    }

    async fn execute(&mut self, actions: Vec<Action>) -> ControlFlow<Exit> {
        for action in actions {
            match action {
                Action::Quit => return ControlFlow::Break(Exit::Quit),
                Action::Send(msg) => match self.engine.outbound().send(&msg).await {
                    Ok(()) => self.session.on_sent(&msg),
                    Err(e) => self.session.on_send_failed(&msg, &e),
                },
                Action::Decline { from } => {
                    let msg = ClientMsg::InvitePass { from: from.clone() };
                    if let Err(e) = self.engine.outbound().send(&msg).await {
                        self.session.on_decline_failed(&from, &e);
                    }
                }
                Action::Authenticate(msg) => match self.engine.begin_auth(&msg).await {
                    Ok(ticket) => {
                        let limit = self.engine.auth_timeout();
                        self.auth_wait = Some(Box::pin(ticket.wait(limit)));
                    }
                    Err(e) => self.session.on_send_failed(&msg, &e),
                },
            }
        }
        ControlFlow::Continue(())
    }

    fn render(&mut self) {
        self.surface.render(&self.session);
        self.phase.send_replace(self.session.phase());
    }
}

async fn wait_auth(wait: &mut Option<AuthWait>) -> AuthOutcome {
    match wait {
        Some(fut) => fut.as_mut().await,
        None => std::future::pending().await,
    }
}
