//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the content handler
//! - Wire up middleware (tracing, timeout, request ID, phase pipeline)
//! - Serve each accepted session with hyper, one request at a time
//! - Attach the session's `Connection` to every request
//! - Apply configuration reloads and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{body::Body, http::Request, routing::any, Router};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RemoveIpConfig;
use crate::http::echo::echo_handler;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::lifecycle::startup::{finalize, StartupError};
use crate::masking::Placeholder;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::net::Connection;
use crate::pipeline::PipelineLayer;
use crate::routing::ScopeTree;

/// How long shutdown waits for open sessions to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP server hosting the phase pipeline.
pub struct HttpServer {
    router: Router,
    config: RemoveIpConfig,
    placeholder: Arc<Placeholder>,
    scopes: Arc<ArcSwap<ScopeTree>>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Finalize the configuration and build the router.
    ///
    /// Fails if the placeholder does not parse or the config is invalid.
    pub fn new(config: RemoveIpConfig) -> Result<Self, StartupError> {
        let prepared = finalize(config)?;
        let pipeline = PipelineLayer::new(prepared.engine, Arc::clone(&prepared.scopes));
        let router = Self::build_router(&prepared.config, pipeline);

        Ok(Self {
            router,
            config: prepared.config,
            placeholder: prepared.placeholder,
            scopes: prepared.scopes,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RemoveIpConfig, pipeline: PipelineLayer) -> Router {
        Router::new()
            .route("/{*path}", any(echo_handler))
            .route("/", any(echo_handler))
            // Inside the pipeline, so a timed-out request is logged as 408.
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(pipeline)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: Listener,
        mut config_updates: mpsc::UnboundedReceiver<RemoveIpConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %addr,
            placeholder = %self.placeholder.text(),
            "HTTP server starting"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, connection, permit)) => {
                        self.serve_connection(stream, connection, permit, shutdown.clone());
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                    Err(e) => return Err(e),
                },
                Some(new_config) = config_updates.recv() => self.apply_reload(new_config),
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Sessions hold clones of the same signal and are closing by now.
        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait_for_drain())
            .await
            .is_err()
        {
            tracing::warn!(
                open_connections = self.tracker.active_count(),
                "Drain timeout elapsed"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn serve_connection(
        &self,
        stream: TcpStream,
        connection: Arc<Connection>,
        permit: ConnectionPermit,
        mut drain: ShutdownSignal,
    ) {
        let router = self.router.clone();
        let guard = self.tracker.track(&connection);

        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;

            let session = Arc::clone(&connection);
            let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                let mut req = req.map(Body::new);
                req.extensions_mut().insert(Arc::clone(&session));
                router.clone().oneshot(req)
            });

            // HTTP/1.1 only: requests of a session are served one after
            // another, so each request's teardown finishes before the next
            // request on the same connection starts.
            let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let mut draining = false;
            loop {
                tokio::select! {
                    res = conn.as_mut() => {
                        if let Err(e) = res {
                            tracing::debug!(
                                connection_id = %connection.id(),
                                error = %e,
                                "Connection ended with error"
                            );
                        }
                        break;
                    }
                    _ = drain.recv(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
        });
    }

    fn apply_reload(&self, config: RemoveIpConfig) {
        for setting in fixed_settings_changed(&self.config, &config) {
            tracing::warn!(setting, "Setting is fixed for the process lifetime; change ignored");
        }

        self.scopes.store(Arc::new(ScopeTree::compile(&config)));
        tracing::info!(servers = config.servers.len(), "Scopes reloaded");
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RemoveIpConfig {
        &self.config
    }

    pub fn placeholder(&self) -> &Arc<Placeholder> {
        &self.placeholder
    }
}

/// Settings a reload cannot change: the placeholder is shared by every
/// session, the others are baked into the listener and router at startup.
fn fixed_settings_changed(current: &RemoveIpConfig, next: &RemoveIpConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if next.placeholder != current.placeholder {
        changed.push("placeholder");
    }
    if next.listener.bind_address != current.listener.bind_address {
        changed.push("listener.bind_address");
    }
    if next.listener.max_connections != current.listener.max_connections {
        changed.push("listener.max_connections");
    }
    if next.timeouts.request_secs != current.timeouts.request_secs {
        changed.push("timeouts.request_secs");
    }
    changed
}
