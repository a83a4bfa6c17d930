//! Request phase pipeline.
//!
//! # Data Flow
//! ```text
//! Request (with Arc<Connection> extension)
//!     → service.rs (resolve scope, build RequestContext)
//!     → post-read handlers
//!     → pre-access handlers
//!     → access handlers
//!     → content (inner axum router)
//!     → log handlers
//!     → RequestContext dropped (teardown)
//! ```
//!
//! # Design Decisions
//! - Handlers are synchronous and never perform I/O
//! - A handler may be registered at several phases and must be idempotent
//! - Any handler error ends the request with 500; other requests are unaffected
//! - Teardown is `Drop`, so it runs on completion, error, timeout and disconnect

pub mod context;
pub mod phase;
pub mod service;

pub use context::RequestContext;
pub use phase::{Flow, Phase, PhaseEngine, PhaseHandler, StageError};
pub use service::{PipelineLayer, PipelineService};
