//! Tower layer that drives the phases around the content service.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::net::Connection;
use crate::observability::metrics;
use crate::pipeline::context::RequestContext;
use crate::pipeline::phase::{Flow, Phase, PhaseEngine, StageError};
use crate::routing::ScopeTree;

/// Wraps a content service with the phase engine.
#[derive(Clone)]
pub struct PipelineLayer {
    engine: Arc<PhaseEngine>,
    scopes: Arc<ArcSwap<ScopeTree>>,
}

impl PipelineLayer {
    pub fn new(engine: Arc<PhaseEngine>, scopes: Arc<ArcSwap<ScopeTree>>) -> Self {
        Self { engine, scopes }
    }
}

impl<S> Layer<S> for PipelineLayer {
    type Service = PipelineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PipelineService {
            inner,
            engine: Arc::clone(&self.engine),
            scopes: Arc::clone(&self.scopes),
        }
    }
}

#[derive(Clone)]
pub struct PipelineService<S> {
    inner: S,
    engine: Arc<PhaseEngine>,
    scopes: Arc<ArcSwap<ScopeTree>>,
}

impl<S> Service<Request<Body>> for PipelineService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let engine = Arc::clone(&self.engine);
        let scopes = self.scopes.load_full();

        Box::pin(async move {
            let ctx = match build_context(&req, &scopes) {
                Ok(ctx) => ctx,
                Err(e) => {
                    tracing::error!(error = %e, "Rejecting request");
                    metrics::record_stage_error(e.kind());
                    return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
                }
            };
            // Dropped on every exit from this future, including cancellation.
            let mut request = InFlight { engine, ctx };

            for phase in Phase::BEFORE_CONTENT {
                match request.engine.run(phase, &mut request.ctx) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Respond(status)) => return Ok(request.respond(status)),
                    Err(e) => {
                        metrics::record_stage_error(e.kind());
                        return Ok(request.respond(StatusCode::INTERNAL_SERVER_ERROR));
                    }
                }
            }

            let response = inner.call(req).await?;
            request.ctx.set_status(response.status());
            Ok(response)
        })
    }
}

/// A request between context creation and teardown.
///
/// Dropping it runs the Log phase, then drops the context, which restores a
/// masked connection. A request dropped before a status was set is logged
/// without one.
struct InFlight {
    engine: Arc<PhaseEngine>,
    ctx: RequestContext,
}

impl InFlight {
    fn respond(&mut self, status: StatusCode) -> Response {
        self.ctx.set_status(status);
        status.into_response()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // Log handlers cannot change the response any more.
        if let Err(e) = self.engine.run(Phase::Log, &mut self.ctx) {
            metrics::record_stage_error(e.kind());
        }
    }
}

fn build_context(req: &Request<Body>, scopes: &ScopeTree) -> Result<RequestContext, StageError> {
    let connection = req
        .extensions()
        .get::<Arc<Connection>>()
        .cloned()
        .ok_or(StageError::MissingConnection)?;

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    Ok(RequestContext::new(
        connection,
        scopes.resolve(req),
        request_id,
        req.method().clone(),
        req.uri().path(),
    ))
}
