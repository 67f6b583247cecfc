//! matechat core: the wire envelope, the typed message vocabulary, and the
//! error type shared by the client crates.
//!
//! Nothing here touches a socket or a runtime. Inbound frames go through
//! [`protocol::Envelope::parse`] and [`protocol::ServerMsg::from_envelope`];
//! outbound ones through [`protocol::ClientMsg::encode`].
//!
//! `unwrap`, `expect` and `panic!` are denied in this crate; every payload
//! shape a server can send ends up as a [`MateChatError`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

pub use error::{MateChatError, Result, Severity};
