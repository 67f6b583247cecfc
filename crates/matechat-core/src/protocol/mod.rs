//! Protocol modules (envelope + typed messages).
//!
//! - `envelope`: the `{Type, Data}` JSON unit, one per text frame, with `Data`
//!   kept as a `RawValue` until the type is known.
//! - `message`: typed client requests and server messages, with validated
//!   per-type payload decoding.
//!
//! Decoders are panic-free: an unexpected `Type` or a badly shaped `Data`
//! becomes a recoverable `MateChatError`.

pub mod envelope;
pub mod message;

pub use envelope::Envelope;
pub use message::{AuthReply, ClientMsg, ServerMsg};
