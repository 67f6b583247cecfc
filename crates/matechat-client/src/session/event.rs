//! Inputs to the session state machine besides server messages.

use matechat_core::protocol::AuthReply;

/// Events forwarded by the UI adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SubmitCredentials { username: String, password: String },
    SubmitInviteTarget(String),
    SubmitDecision(String),
    SubmitChatText(String),
    Quit,
}

/// How a pending `Register`/`Login` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Reply(AuthReply),
    TimedOut,
    /// The transport went away before a reply; a fatal delivery follows.
    Abandoned,
}
