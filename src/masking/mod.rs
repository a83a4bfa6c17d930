//! Client address masking.
//!
//! # Data Flow
//! ```text
//! post-read / pre-access phase
//!     → stage.rs (idempotency check, policy lookup)
//!     → snapshot.rs (capture the visible address)
//!     → connection shows placeholder.rs value
//!     → restore.rs guard parked in the request context
//!
//! Request teardown (any path):
//!     context dropped → guard dropped → original address written back
//! ```
//!
//! # Design Decisions
//! - Placeholder parsed once at startup and shared by reference
//! - Policy merged per scope at config load; requests only read it
//! - Disabled scopes allocate nothing and never touch the connection

pub mod placeholder;
pub mod policy;
pub mod restore;
pub mod snapshot;
pub mod stage;

pub use placeholder::{Placeholder, PlaceholderError, DEFAULT_PLACEHOLDER};
pub use policy::{MaskingPolicy, Toggle};
pub use restore::RestorationGuard;
pub use snapshot::IdentitySnapshot;
pub use stage::MaskingStage;
