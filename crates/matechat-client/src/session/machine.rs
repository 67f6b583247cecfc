//! Session transitions.
//!
//! Every handler mutates the record in place and returns the actions the
//! runtime must perform. Sends are reported back through [`Session::on_sent`]
//! and [`Session::on_send_failed`], so the record only reflects what actually
//! reached the transport.

use matechat_core::error::MateChatError;
use matechat_core::protocol::{AuthReply, ClientMsg, ServerMsg};

use super::state::{AuthStage, PendingLogin};
use super::{Action, AuthOutcome, Phase, Session, UiEvent};

const MATE_LEFT: &str = "Your mate has left the chat.";

impl Session {
    /// Apply one UI event.
    pub fn handle_ui(&mut self, event: UiEvent) -> Vec<Action> {
        if event == UiEvent::Quit {
            return vec![Action::Quit];
        }
        if self.phase == Phase::Closed {
            tracing::debug!("input after the connection closed");
            return vec![];
        }

        match event {
            UiEvent::SubmitCredentials { username, password } => {
                self.submit_credentials(username, password)
            }
            UiEvent::SubmitInviteTarget(target) => self.submit_invite(target),
            UiEvent::SubmitDecision(answer) => self.submit_decision(&answer),
            UiEvent::SubmitChatText(text) => self.submit_chat(text),
            UiEvent::Quit => vec![Action::Quit],
        }
    }

    fn submit_credentials(&mut self, username: String, password: String) -> Vec<Action> {
        if self.phase != Phase::LoggedOut {
            tracing::debug!(phase = self.phase.as_str(), "credentials outside login");
            return vec![];
        }
        if self.pending_login.is_some() {
            self.notice("Login already in progress, please wait.");
            return vec![];
        }
        let username = username.trim().to_string();
        if username.is_empty() {
            self.notice("Username must not be empty.");
            return vec![];
        }

        self.clear_notice();
        self.pending_login = Some(PendingLogin {
            username: username.clone(),
            password: password.clone(),
            stage: AuthStage::Register,
        });
        vec![Action::Authenticate(ClientMsg::Register { username, password })]
    }

    fn submit_invite(&mut self, target: String) -> Vec<Action> {
        if self.phase != Phase::Browsing {
            tracing::debug!(phase = self.phase.as_str(), "invite outside browsing");
            return vec![];
        }
        let target = target.trim().to_string();
        if target.is_empty() {
            return vec![];
        }
        vec![Action::Send(ClientMsg::Invite { target })]
    }

    fn submit_decision(&mut self, answer: &str) -> Vec<Action> {
        if self.phase != Phase::AwaitingDecision {
            tracing::debug!(phase = self.phase.as_str(), "decision without an invitation");
            return vec![];
        }
        let Some(from) = self.invite_from.take() else {
            self.phase = Phase::Browsing;
            return vec![];
        };

        self.clear_notice();
        if answer.trim().eq_ignore_ascii_case("y") {
            tracing::info!(peer = %from, "invitation accepted");
            self.peer = Some(from.clone());
            self.phase = Phase::Chatting;
            vec![Action::Send(ClientMsg::InviteCrush { from })]
        } else {
            self.phase = Phase::Browsing;
            vec![Action::Send(ClientMsg::InvitePass { from })]
        }
    }

    fn submit_chat(&mut self, text: String) -> Vec<Action> {
        if self.phase != Phase::Chatting {
            self.notice("You are not in a chat.");
            return vec![];
        }
        if text.trim().is_empty() {
            self.notice("Empty message not sent.");
            return vec![];
        }
        vec![Action::Send(ClientMsg::Chat { text })]
    }

    /// Apply one delivered server message.
    pub fn handle_server(&mut self, msg: ServerMsg) -> Vec<Action> {
        if self.phase == Phase::Closed {
            return vec![];
        }

        match msg {
            ServerMsg::Auth(reply) => {
                tracing::warn!(reply = reply.as_str(), "auth reply outside the pending window");
                vec![]
            }
            ServerMsg::InviteRequest { from } => self.invite_requested(from),
            ServerMsg::InviteAccept { peer } => {
                if matches!(self.phase, Phase::Browsing | Phase::Chatting) {
                    tracing::info!(%peer, "chat started");
                    self.peer = Some(peer);
                    self.phase = Phase::Chatting;
                    self.clear_notice();
                } else {
                    tracing::warn!(phase = self.phase.as_str(), %peer, "invite accept ignored");
                }
                vec![]
            }
            ServerMsg::InviteRefuse { peer } => {
                if self.phase.is_logged_in() {
                    self.notice(format!("Invite refused by: {peer}"));
                }
                vec![]
            }
            ServerMsg::Chat { text } => {
                let who = self.peer.as_deref().unwrap_or("mate");
                self.transcript.push(format!("{who}: {text}"));
                vec![]
            }
            ServerMsg::MateClosed => {
                if self.phase == Phase::Chatting {
                    tracing::info!(peer = ?self.peer, "mate left");
                    self.peer = None;
                    self.phase = Phase::Browsing;
                    self.notice(MATE_LEFT);
                }
                vec![]
            }
            ServerMsg::OnlineUsers { roster } => {
                self.online_roster = roster;
                vec![]
            }
        }
    }

    fn invite_requested(&mut self, from: String) -> Vec<Action> {
        match self.phase {
            Phase::Browsing => {
                self.notice(format!("Invite from: {from} (y/n)"));
                self.invite_from = Some(from);
                self.phase = Phase::AwaitingDecision;
                vec![]
            }
            // One mate at a time: anyone else is turned down right away.
            Phase::AwaitingDecision | Phase::Chatting => {
                tracing::info!(%from, phase = self.phase.as_str(), "busy, declining invitation");
                vec![Action::Decline { from }]
            }
            Phase::LoggedOut | Phase::Closed => vec![],
        }
    }

    /// Apply the outcome of the pending `Register`/`Login`.
    pub fn handle_auth_outcome(&mut self, outcome: AuthOutcome) -> Vec<Action> {
        let Some(pending) = self.pending_login.take() else {
            tracing::warn!(?outcome, "auth outcome without a pending login");
            return vec![];
        };

        match outcome {
            AuthOutcome::Reply(AuthReply::UserExist) if pending.stage == AuthStage::Register => {
                let msg = ClientMsg::Login {
                    username: pending.username.clone(),
                    password: pending.password.clone(),
                };
                self.pending_login = Some(PendingLogin {
                    stage: AuthStage::Login,
                    ..pending
                });
                vec![Action::Authenticate(msg)]
            }
            AuthOutcome::Reply(AuthReply::UserExist) => {
                self.notice("Unexpected reply from server, please try again.");
                vec![]
            }
            AuthOutcome::Reply(AuthReply::AlreadyOnline) => {
                self.notice("User already online");
                vec![]
            }
            AuthOutcome::Reply(AuthReply::WrongPassword) => {
                self.notice("Wrong password");
                vec![]
            }
            AuthOutcome::Reply(reply) => {
                tracing::info!(user = %pending.username, reply = reply.as_str(), "logged in");
                self.self_identity = Some(pending.username);
                self.phase = Phase::Browsing;
                self.clear_notice();
                vec![]
            }
            AuthOutcome::TimedOut => {
                self.notice("Server did not answer, please try again.");
                vec![]
            }
            AuthOutcome::Abandoned => vec![],
        }
    }

    /// The transport is gone; nothing can be sent or received any more.
    pub fn handle_fatal(&mut self, err: &MateChatError) {
        tracing::error!(error = %err, phase = self.phase.as_str(), "session closed");
        self.phase = Phase::Closed;
        self.peer = None;
        self.invite_from = None;
        self.pending_login = None;
        self.notice(format!("Connection closed: {err}"));
    }

    /// A `Send` action reached the transport.
    pub fn on_sent(&mut self, msg: &ClientMsg) {
        match msg {
            ClientMsg::Chat { text } => {
                let me = self.self_identity.as_deref().unwrap_or("me");
                self.transcript.push(format!("{me}: {text}"));
            }
            ClientMsg::Invite { target } => {
                self.notice(format!("Invitation sent to {target}."));
            }
            _ => {}
        }
    }

    /// A send failed. The record goes back to where it was before the
    /// action, so the user can simply try again.
    pub fn on_send_failed(&mut self, msg: &ClientMsg, err: &MateChatError) {
        match msg {
            ClientMsg::Register { .. } | ClientMsg::Login { .. } => {
                self.pending_login = None;
            }
            ClientMsg::InviteCrush { from } | ClientMsg::InvitePass { from } => {
                if self.phase != Phase::Closed {
                    self.peer = None;
                    self.invite_from = Some(from.clone());
                    self.phase = Phase::AwaitingDecision;
                }
            }
            ClientMsg::Invite { .. } | ClientMsg::Chat { .. } => {}
        }
        if self.phase != Phase::Closed {
            self.notice(format!("{} not delivered ({err}), please retry.", msg.msg_type()));
        }
    }

    /// An automatic decline could not be written. Phase, peer and any
    /// pending question stay as they are.
    pub fn on_decline_failed(&mut self, from: &str, err: &MateChatError) {
        if self.phase != Phase::Closed {
            self.notice(format!("Could not decline invite from {from} ({err})."));
        }
    }
}
