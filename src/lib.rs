//! Client address masking for an HTTP request pipeline.
//!
//! A connection's visible address is replaced with a fixed placeholder for the
//! lifetime of each request whose scope enables `removeip`, and put back when
//! the request ends, however it ends.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod masking;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod security;

pub use config::RemoveIpConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
