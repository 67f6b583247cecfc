//! Top-level facade crate for MateChat.
//!
//! Re-exports the protocol types and the client library so users can depend on a single crate.

pub mod core {
    pub use matechat_core::*;
}

pub mod client {
    pub use matechat_client::*;
}
