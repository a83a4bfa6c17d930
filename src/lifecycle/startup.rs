//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Parse the placeholder address (fatal on failure)
//! - Compile the scope tree and register phase handlers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing here runs per request

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::validation::{join_errors, validate_config, ValidationError};
use crate::config::RemoveIpConfig;
use crate::masking::{MaskingStage, Placeholder, PlaceholderError};
use crate::observability::AccessLog;
use crate::pipeline::{Phase, PhaseEngine};
use crate::routing::ScopeTree;
use crate::security::AccessControl;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),
}

/// Everything the server needs, built once from a configuration.
#[derive(Debug)]
pub struct Prepared {
    pub config: RemoveIpConfig,
    pub placeholder: Arc<Placeholder>,
    pub scopes: Arc<ArcSwap<ScopeTree>>,
    pub engine: Arc<PhaseEngine>,
}

/// Finalize a configuration before any request is served.
pub fn finalize(config: RemoveIpConfig) -> Result<Prepared, StartupError> {
    let placeholder = Arc::new(Placeholder::parse(&config.placeholder)?);
    validate_config(&config).map_err(StartupError::Validation)?;

    let scopes = Arc::new(ArcSwap::from_pointee(ScopeTree::compile(&config)));
    let engine = Arc::new(build_engine(&placeholder));

    tracing::info!(
        placeholder = %placeholder.text(),
        global_masking = scopes.load().global().masking().enabled(),
        servers = config.servers.len(),
        "Configuration finalized"
    );

    Ok(Prepared {
        config,
        placeholder,
        scopes,
        engine,
    })
}

/// Register the phase handlers.
///
/// The masking stage goes in twice: post-read catches the request as early as
/// possible and pre-access guarantees it before access control and logging.
pub fn build_engine(placeholder: &Arc<Placeholder>) -> PhaseEngine {
    let stage = Arc::new(MaskingStage::new(Arc::clone(placeholder)));

    PhaseEngine::builder()
        .register(Phase::PostRead, stage.clone())
        .register(Phase::PreAccess, stage)
        .register(Phase::Access, Arc::new(AccessControl))
        .register(Phase::Log, Arc::new(AccessLog))
        .build()
}
