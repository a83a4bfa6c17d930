//! Per-request state carried through the phases.

use std::sync::Arc;
use std::time::Instant;

use axum::http::{Method, StatusCode};

use crate::masking::RestorationGuard;
use crate::net::Connection;
use crate::routing::Scope;

/// State for one request, dropped when the request ends however it ends.
///
/// Dropping the context drops the masking slot, which restores the
/// connection's address.
#[derive(Debug)]
pub struct RequestContext {
    connection: Arc<Connection>,
    scope: Arc<Scope>,
    request_id: String,
    method: Method,
    path: String,
    started: Instant,
    status: Option<StatusCode>,
    masking: Option<RestorationGuard>,
}

impl RequestContext {
    pub fn new(
        connection: Arc<Connection>,
        scope: Arc<Scope>,
        request_id: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            scope,
            request_id: request_id.into(),
            method,
            path: path.into(),
            started: Instant::now(),
            status: None,
            masking: None,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The masking slot; `Some` once the address has been masked.
    pub fn masking(&self) -> Option<&RestorationGuard> {
        self.masking.as_ref()
    }

    /// Fill the masking slot. Returns the guard back if the slot is taken.
    pub fn attach_masking(&mut self, guard: RestorationGuard) -> Result<(), RestorationGuard> {
        if self.masking.is_some() {
            return Err(guard);
        }
        self.masking = Some(guard);
        Ok(())
    }
}
