//! Side effects requested by the session state machine.

use matechat_core::protocol::ClientMsg;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Fire-and-forget send on the user's behalf.
    Send(ClientMsg),
    /// Turn down an invitation from `from` while busy. Not user-initiated,
    /// so a failed write leaves the record alone.
    Decline { from: String },
    /// Send a `Register`/`Login` and report the paired reply through
    /// [`crate::session::AuthOutcome`].
    Authenticate(ClientMsg),
    Quit,
}
