//! Capture of a connection's visible address taken at masking time.

use std::collections::TryReserveError;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use crate::net::{Connection, VisibleAddress};

/// Original identity of a connection, captured once and consumed once.
///
/// Holds only a weak reference to the connection: the session may end before
/// the request that masked it is torn down.
#[derive(Debug)]
pub struct IdentitySnapshot {
    connection: Weak<Connection>,
    sockaddr: SocketAddr,
    socklen: u32,
    text: String,
}

impl IdentitySnapshot {
    /// Copy the connection's current visible address.
    ///
    /// The display text buffer is reserved fallibly so running out of memory
    /// surfaces as an error for this request instead of aborting the process.
    pub fn capture(connection: &Arc<Connection>) -> Result<Self, TryReserveError> {
        let current = connection.visible_addr();

        let mut text = String::new();
        text.try_reserve_exact(current.text().len())?;
        text.push_str(current.text());

        Ok(Self {
            connection: Arc::downgrade(connection),
            sockaddr: current.sockaddr(),
            socklen: current.socklen(),
            text,
        })
    }

    pub fn sockaddr(&self) -> SocketAddr {
        self.sockaddr
    }

    pub fn socklen(&self) -> u32 {
        self.socklen
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Write the captured address back onto the connection.
    ///
    /// Returns `false` if the connection no longer exists.
    pub fn restore(self) -> bool {
        let Some(connection) = self.connection.upgrade() else {
            return false;
        };

        connection.set_visible(Arc::new(VisibleAddress::from_parts(
            self.sockaddr,
            self.socklen,
            self.text,
        )));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_round_trips_every_field() {
        let conn = Arc::new(Connection::new("203.0.113.7:51000".parse().unwrap()));
        let before = conn.visible_addr();

        let snapshot = IdentitySnapshot::capture(&conn).unwrap();
        assert_eq!(snapshot.text(), "203.0.113.7");
        assert_eq!(snapshot.socklen(), before.socklen());

        conn.set_visible(Arc::new(VisibleAddress::from_socket(
            "10.9.9.9:1".parse().unwrap(),
        )));
        assert!(snapshot.restore());

        let after = conn.visible_addr();
        assert_eq!(after.sockaddr(), before.sockaddr());
        assert_eq!(after.socklen(), before.socklen());
        assert_eq!(after.text().as_bytes(), before.text().as_bytes());
    }

    #[test]
    fn restore_after_connection_gone_is_harmless() {
        let conn = Arc::new(Connection::new("203.0.113.7:51000".parse().unwrap()));
        let snapshot = IdentitySnapshot::capture(&conn).unwrap();
        drop(conn);
        assert!(!snapshot.restore());
    }
}
