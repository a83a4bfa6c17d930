//! Address based access control.
//!
//! Runs at the access phase, after the masking stage, and therefore judges the
//! *visible* address: a masked request is evaluated as the placeholder.

use std::net::IpAddr;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;
use crate::pipeline::{Flow, PhaseHandler, RequestContext, StageError};

/// Allow/deny lists for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessRules {
    /// When non-empty, only these addresses are admitted.
    pub allow: Vec<IpAddr>,
    /// Addresses always refused.
    pub deny: Vec<IpAddr>,
}

impl AccessRules {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// A scope without rules of its own inherits its parent's rules.
    pub fn merge(&self, parent: &AccessRules) -> AccessRules {
        if self.is_empty() {
            parent.clone()
        } else {
            self.clone()
        }
    }

    pub fn permits(&self, ip: IpAddr) -> bool {
        if self.deny.contains(&ip) {
            return false;
        }
        self.allow.is_empty() || self.allow.contains(&ip)
    }
}

/// Access phase handler enforcing the scope's rules.
#[derive(Debug, Default)]
pub struct AccessControl;

impl PhaseHandler for AccessControl {
    fn name(&self) -> &'static str {
        "access"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<Flow, StageError> {
        let rules = ctx.scope().access();
        if rules.is_empty() {
            return Ok(Flow::Continue);
        }

        let visible = ctx.connection().visible_addr();
        if rules.permits(visible.sockaddr().ip()) {
            return Ok(Flow::Continue);
        }

        tracing::warn!(
            request_id = %ctx.request_id(),
            client = %visible,
            scope = %ctx.scope().name(),
            "Access denied"
        );
        metrics::record_access_denied();
        Ok(Flow::Respond(StatusCode::FORBIDDEN))
    }
}
