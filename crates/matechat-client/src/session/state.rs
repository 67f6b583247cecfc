//! Session record.
//!
//! Owned by the session loop alone; the surface only ever sees `&Session`.

/// Position in the login/invite/chat flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Not authenticated yet (possibly with a request in flight).
    LoggedOut,
    /// Logged in, no mate.
    Browsing,
    /// An invitation arrived and waits for a y/n answer.
    AwaitingDecision,
    /// In a chat with `peer`.
    Chatting,
    /// Transport is gone. Terminal.
    Closed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::LoggedOut => "logged_out",
            Phase::Browsing => "browsing",
            Phase::AwaitingDecision => "awaiting_decision",
            Phase::Chatting => "chatting",
            Phase::Closed => "closed",
        }
    }

    pub fn is_logged_in(self) -> bool {
        matches!(
            self,
            Phase::Browsing | Phase::AwaitingDecision | Phase::Chatting
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthStage {
    Register,
    Login,
}

/// Credentials of the request currently in flight.
#[derive(Debug, Clone)]
pub(crate) struct PendingLogin {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) stage: AuthStage,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) phase: Phase,
    pub(crate) self_identity: Option<String>,
    pub(crate) peer: Option<String>,
    pub(crate) invite_from: Option<String>,
    pub(crate) transcript: Vec<String>,
    pub(crate) last_notice: Option<String>,
    pub(crate) online_roster: String,
    pub(crate) pending_login: Option<PendingLogin>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::LoggedOut,
            self_identity: None,
            peer: None,
            invite_from: None,
            transcript: Vec::new(),
            last_notice: None,
            online_roster: String::new(),
            pending_login: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Username, once authenticated.
    pub fn self_identity(&self) -> Option<&str> {
        self.self_identity.as_deref()
    }

    /// Current mate. `Some` exactly when chatting.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Who is waiting for our y/n answer.
    pub fn invite_from(&self) -> Option<&str> {
        self.invite_from.as_deref()
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn last_notice(&self) -> Option<&str> {
        self.last_notice.as_deref()
    }

    pub fn online_roster(&self) -> &str {
        &self.online_roster
    }

    pub fn is_auth_pending(&self) -> bool {
        self.pending_login.is_some()
    }

    pub(crate) fn notice(&mut self, text: impl Into<String>) {
        self.last_notice = Some(text.into());
    }

    pub(crate) fn clear_notice(&mut self) {
        self.last_notice = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
