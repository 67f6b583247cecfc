//! Session engine: the record, its inputs, and the transitions between them.
//!
//! The state machine never touches the transport. It consumes [`UiEvent`]s,
//! server messages and auth outcomes, and answers with [`Action`]s for the
//! runtime to execute. That keeps every transition testable without a socket.

mod action;
mod event;
mod machine;
mod state;

pub use action::Action;
pub use event::{AuthOutcome, UiEvent};
pub use state::{Phase, Session};
