//! Transport layer (WebSocket client).
//!
//! Exposes the frame codec, the serialized writer shared by the sender and
//! the liveness monitor, and the background reader/monitor loops.

pub mod codec;
pub mod sink;
pub mod ws;

pub use sink::{FrameSink, Outbound, SharedSink};
