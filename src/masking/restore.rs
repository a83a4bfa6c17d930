//! Teardown of a masked request.

use crate::masking::snapshot::IdentitySnapshot;
use crate::observability::metrics;

/// Puts a connection's original address back when dropped.
///
/// The guard lives in the request context, so it fires on every way a request
/// can end: normal completion, error responses, timeouts and client
/// disconnects (the request future is dropped).
#[derive(Debug)]
pub struct RestorationGuard {
    snapshot: Option<IdentitySnapshot>,
}

impl RestorationGuard {
    pub fn new(snapshot: IdentitySnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    /// The original identity held by this guard.
    pub fn original(&self) -> Option<&IdentitySnapshot> {
        self.snapshot.as_ref()
    }

    /// Discard the guard without touching the connection.
    pub fn disarm(mut self) {
        self.snapshot = None;
    }
}

impl Drop for RestorationGuard {
    fn drop(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };

        let original = snapshot.sockaddr();
        if snapshot.restore() {
            tracing::trace!(original = %original, "Connection address restored");
            metrics::record_restored();
        } else {
            tracing::debug!(original = %original, "Connection gone before restoration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Connection, VisibleAddress};
    use std::sync::Arc;

    #[test]
    fn disarmed_guard_leaves_address_alone() {
        let conn = Arc::new(Connection::new("198.51.100.4:9000".parse().unwrap()));
        let guard = RestorationGuard::new(IdentitySnapshot::capture(&conn).unwrap());
        let masked = Arc::new(VisibleAddress::from_socket("0.0.0.0:0".parse().unwrap()));
        conn.set_visible(Arc::clone(&masked));

        guard.disarm();
        assert!(Arc::ptr_eq(&conn.visible_addr(), &masked));
    }

    #[test]
    fn drop_restores_once() {
        let conn = Arc::new(Connection::new("198.51.100.4:9000".parse().unwrap()));
        let guard = RestorationGuard::new(IdentitySnapshot::capture(&conn).unwrap());
        assert_eq!(guard.original().unwrap().text(), "198.51.100.4");

        conn.set_visible(Arc::new(VisibleAddress::from_socket(
            "0.0.0.0:0".parse().unwrap(),
        )));
        drop(guard);

        assert_eq!(conn.visible_addr().text(), "198.51.100.4");
    }

    #[test]
    fn panic_unwind_still_restores() {
        let conn = Arc::new(Connection::new("198.51.100.4:9000".parse().unwrap()));
        let for_task = Arc::clone(&conn);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RestorationGuard::new(IdentitySnapshot::capture(&for_task).unwrap());
            for_task.set_visible(Arc::new(VisibleAddress::from_socket(
                "0.0.0.0:0".parse().unwrap(),
            )));
            panic!("handler failed");
        }));

        assert!(result.is_err());
        assert_eq!(conn.visible_addr().text(), "198.51.100.4");
    }
}
