//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (session object, visible address, tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - The socket peer address is immutable; only the visible address changes

pub mod address;
pub mod connection;
pub mod listener;

pub use address::VisibleAddress;
pub use connection::{Connection, ConnectionId, ConnectionTracker};
pub use listener::Listener;
