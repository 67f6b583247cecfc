//! Inbound routing.
//!
//! Re-exports the router and the auth reply slot so the reader, the monitor
//! and the session loop can depend on this module directly.

pub mod router;

pub use router::{AuthTicket, Delivery, PendingAuth, Router};
