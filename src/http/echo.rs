//! Content handler describing the client as the pipeline sees it.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{HeaderMap, Method, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::net::Connection;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    /// Visible address text (the placeholder when masked).
    pub remote_addr: String,
    pub connection_id: u64,
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
}

pub async fn echo_handler(
    Extension(connection): Extension<Arc<Connection>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<EchoResponse> {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Json(EchoResponse {
        remote_addr: connection.visible_addr().text().to_string(),
        connection_id: connection.id().as_u64(),
        request_id,
        method: method.to_string(),
        path: uri.path().to_string(),
    })
}
