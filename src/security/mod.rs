//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Access phase:
//!     → access_control.rs (allow/deny against the visible address)
//!     → Pass to content
//! ```
//!
//! # Design Decisions
//! - Runs after masking, so masked requests are judged as the placeholder
//! - Fail closed: a denied address gets 403

pub mod access_control;

pub use access_control::{AccessControl, AccessRules};
