//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper HTTP/1.1 per session, Connection attached to requests)
//!     → request ID, timeout, trace layers
//!     → pipeline layer (phases around content)
//!     → echo.rs (content)
//!     → Send to client
//! ```

pub mod echo;
pub mod server;

pub use echo::EchoResponse;
pub use server::HttpServer;
