//! Phases, phase handlers and the engine that runs them.

use std::collections::TryReserveError;
use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::pipeline::context::RequestContext;

/// Ordered stages of request processing. Content is the inner service and
/// has no handlers of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Right after the request line and headers are read.
    PostRead,
    /// Before access control is evaluated.
    PreAccess,
    /// Access control.
    Access,
    /// After the response status is known, before teardown.
    Log,
}

impl Phase {
    /// Phases run before content, in order.
    pub const BEFORE_CONTENT: [Phase; 3] = [Phase::PostRead, Phase::PreAccess, Phase::Access];

    fn index(self) -> usize {
        match self {
            Phase::PostRead => 0,
            Phase::PreAccess => 1,
            Phase::Access => 2,
            Phase::Log => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PostRead => "post-read",
            Phase::PreAccess => "pre-access",
            Phase::Access => "access",
            Phase::Log => "log",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Hand the request to the next handler.
    Continue,
    /// Stop processing and answer with this status.
    Respond(StatusCode),
}

/// Failures that end a single request with 500.
#[derive(Debug, Error)]
pub enum StageError {
    /// Per-request state could not be allocated.
    #[error("failed to allocate request state: {0}")]
    Allocation(#[from] TryReserveError),
    /// The request reached the pipeline without a connection object.
    #[error("request has no connection attached")]
    MissingConnection,
    /// The masking slot was already filled when a new guard arrived.
    #[error("masking slot already holds a restoration guard")]
    MaskingSlotTaken,
}

impl StageError {
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Allocation(_) => "allocation",
            StageError::MissingConnection => "missing_connection",
            StageError::MaskingSlotTaken => "masking_slot_taken",
        }
    }
}

/// A handler invoked at one or more phases.
///
/// Handlers are synchronous: they never block or perform I/O.
pub trait PhaseHandler: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn handle(&self, ctx: &mut RequestContext) -> Result<Flow, StageError>;
}

/// Handlers registered per phase, immutable once built.
#[derive(Default, Clone)]
pub struct PhaseEngine {
    phases: [Vec<Arc<dyn PhaseHandler>>; 4],
}

impl PhaseEngine {
    pub fn builder() -> PhaseEngineBuilder {
        PhaseEngineBuilder::default()
    }

    /// Run every handler of a phase in registration order.
    pub fn run(&self, phase: Phase, ctx: &mut RequestContext) -> Result<Flow, StageError> {
        for handler in &self.phases[phase.index()] {
            match handler.handle(ctx) {
                Ok(Flow::Continue) => {}
                Ok(flow) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        phase = %phase,
                        handler = handler.name(),
                        ?flow,
                        "Phase handler finalized request"
                    );
                    return Ok(flow);
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        phase = %phase,
                        handler = handler.name(),
                        error = %e,
                        "Phase handler failed"
                    );
                    return Err(e);
                }
            }
        }
        Ok(Flow::Continue)
    }

    pub fn handler_count(&self, phase: Phase) -> usize {
        self.phases[phase.index()].len()
    }
}

impl std::fmt::Debug for PhaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for phase in [Phase::PostRead, Phase::PreAccess, Phase::Access, Phase::Log] {
            let names: Vec<_> = self.phases[phase.index()].iter().map(|h| h.name()).collect();
            map.entry(&phase.as_str(), &names);
        }
        map.finish()
    }
}

#[derive(Default)]
pub struct PhaseEngineBuilder {
    engine: PhaseEngine,
}

impl PhaseEngineBuilder {
    /// Register a handler at a phase. The same handler may be registered at
    /// several phases.
    pub fn register(mut self, phase: Phase, handler: Arc<dyn PhaseHandler>) -> Self {
        self.engine.phases[phase.index()].push(handler);
        self
    }

    pub fn build(self) -> PhaseEngine {
        self.engine
    }
}
