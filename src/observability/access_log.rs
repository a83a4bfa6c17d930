//! Access log written at the log phase.
//!
//! Runs before the request context is dropped, so a masked request is logged
//! with the placeholder address.

use axum::http::StatusCode;

use crate::observability::metrics;
use crate::pipeline::{Flow, PhaseHandler, RequestContext, StageError};

/// Logged for requests that ended before a response status was chosen,
/// such as a client closing the connection mid-request.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Default)]
pub struct AccessLog;

impl PhaseHandler for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<Flow, StageError> {
        let status = logged_status(ctx.status());

        tracing::info!(
            target: "removeip::access",
            request_id = %ctx.request_id(),
            remote_addr = %ctx.connection().visible_addr(),
            connection_id = %ctx.connection().id(),
            scope = %ctx.scope().name(),
            method = %ctx.method(),
            path = %ctx.path(),
            status,
            elapsed_ms = ctx.started().elapsed().as_millis() as u64,
            "request"
        );
        metrics::record_request(status, ctx.started());

        Ok(Flow::Continue)
    }
}

fn logged_status(status: Option<StatusCode>) -> u16 {
    status.map_or(CLIENT_CLOSED_REQUEST, |s| s.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::{MaskingPolicy, MaskingStage, Placeholder, Toggle};
    use crate::net::Connection;
    use crate::pipeline::{Phase, PhaseEngine};
    use crate::routing::Scope;
    use axum::http::Method;
    use std::sync::Arc;

    #[test]
    fn unanswered_request_logs_client_closed() {
        assert_eq!(logged_status(None), 499);
        assert_eq!(logged_status(Some(StatusCode::REQUEST_TIMEOUT)), 408);
    }

    #[test]
    fn masked_request_is_logged_before_restore() {
        let conn = Arc::new(Connection::new("203.0.113.7:40000".parse().unwrap()));
        let scope = Scope::new(
            "test",
            MaskingPolicy::from_merged(Toggle::On),
            Default::default(),
        );
        let mut ctx = RequestContext::new(
            Arc::clone(&conn),
            Arc::new(scope),
            "req-1",
            Method::GET,
            "/",
        );
        let engine = PhaseEngine::builder()
            .register(
                Phase::PostRead,
                Arc::new(MaskingStage::new(Arc::new(Placeholder::default()))),
            )
            .register(Phase::Log, Arc::new(AccessLog))
            .build();

        engine.run(Phase::PostRead, &mut ctx).unwrap();
        ctx.set_status(StatusCode::OK);
        assert_eq!(engine.run(Phase::Log, &mut ctx).unwrap(), Flow::Continue);
        assert_eq!(ctx.connection().visible_addr().text(), "0.0.0.0");

        drop(ctx);
        assert_eq!(conn.visible_addr().text(), "203.0.113.7");
    }
}
