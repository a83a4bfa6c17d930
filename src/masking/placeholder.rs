//! Placeholder address installed on masked connections.
//!
//! Parsed once while the configuration is finalized and shared read-only
//! through `Arc` afterwards. A literal that does not parse stops startup.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;

use crate::net::{Connection, VisibleAddress};

/// Literal used when the configuration does not name a placeholder.
pub const DEFAULT_PLACEHOLDER: &str = "0.0.0.0";

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error("invalid placeholder address {literal:?}: {source}")]
    Parse {
        literal: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// The parsed placeholder address.
#[derive(Debug)]
pub struct Placeholder {
    address: Arc<VisibleAddress>,
}

impl Placeholder {
    /// Parse an IP literal into the structured form used by the swap.
    ///
    /// The port is zero and the display text is the literal as written.
    pub fn parse(literal: &str) -> Result<Self, PlaceholderError> {
        let ip: IpAddr = literal.parse().map_err(|source| PlaceholderError::Parse {
            literal: literal.to_string(),
            source,
        })?;

        Ok(Self {
            address: Arc::new(VisibleAddress::new(SocketAddr::new(ip, 0), literal)),
        })
    }

    pub fn address(&self) -> &Arc<VisibleAddress> {
        &self.address
    }

    pub fn text(&self) -> &str {
        self.address.text()
    }

    /// True when this exact placeholder value is what the connection exposes.
    pub fn is_installed_on(&self, connection: &Connection) -> bool {
        Arc::ptr_eq(&connection.visible_addr(), &self.address)
    }
}

impl Default for Placeholder {
    fn default() -> Self {
        Self {
            address: Arc::new(VisibleAddress::new(
                SocketAddr::new(IpAddr::from([0, 0, 0, 0]), 0),
                DEFAULT_PLACEHOLDER,
            )),
        }
    }
}
