//! MateChat client library.
//!
//! Wires the websocket transport, the auth reply slot and delivery queue,
//! and the session state machine into one session loop. Consumed by the
//! `matechat` binary and by integration tests.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod runtime;
pub mod session;
pub mod surface;
pub mod transport;
