//! Scope resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Scope Compilation (at config load):
//!     RemoveIpConfig (global, servers, locations)
//!     → merge each scope with its parent
//!     → sort locations by prefix length
//!     → Freeze as immutable ScopeTree
//!
//! Incoming Request (host, path)
//!     → scope.rs (server lookup, location lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: Arc<Scope> with resolved settings
//! ```
//!
//! # Design Decisions
//! - Scopes compiled at startup or reload, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always resolves to the same scope

pub mod matcher;
pub mod scope;

pub use scope::{Scope, ScopeTree};
