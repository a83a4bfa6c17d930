//! The masking phase handler.
//!
//! Registered at both the post-read and pre-access phases. Whichever runs first
//! for a request does the swap; every later call sees the filled masking slot
//! and returns without touching anything.

use std::sync::Arc;

use crate::masking::placeholder::Placeholder;
use crate::masking::restore::RestorationGuard;
use crate::masking::snapshot::IdentitySnapshot;
use crate::observability::metrics;
use crate::pipeline::{Flow, PhaseHandler, RequestContext, StageError};

/// Replaces the connection's visible address with the placeholder for the
/// lifetime of a request.
#[derive(Debug, Clone)]
pub struct MaskingStage {
    placeholder: Arc<Placeholder>,
}

impl MaskingStage {
    pub fn new(placeholder: Arc<Placeholder>) -> Self {
        Self { placeholder }
    }

    pub fn placeholder(&self) -> &Arc<Placeholder> {
        &self.placeholder
    }
}

impl MaskingStage {
    /// Fill the masking slot, then swap in the placeholder. The address is
    /// never changed unless the request owns a guard that will undo it.
    fn install(&self, ctx: &mut RequestContext) -> Result<(), StageError> {
        let connection = Arc::clone(ctx.connection());
        let guard = RestorationGuard::new(IdentitySnapshot::capture(&connection)?);
        if let Err(refused) = ctx.attach_masking(guard) {
            // The address was never swapped, so there is nothing to undo.
            refused.disarm();
            return Err(StageError::MaskingSlotTaken);
        }

        connection.set_visible(Arc::clone(self.placeholder.address()));
        Ok(())
    }
}

impl PhaseHandler for MaskingStage {
    fn name(&self) -> &'static str {
        "removeip"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<Flow, StageError> {
        if ctx.masking().is_some() {
            return Ok(Flow::Continue);
        }

        if !ctx.scope().masking().enabled() {
            return Ok(Flow::Continue);
        }

        self.install(ctx)?;

        tracing::debug!(
            request_id = %ctx.request_id(),
            connection_id = %ctx.connection().id(),
            scope = %ctx.scope().name(),
            "Client address masked"
        );
        metrics::record_masked(ctx.scope().name());

        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::{MaskingPolicy, Toggle};
    use crate::net::Connection;
    use crate::pipeline::{Phase, PhaseEngine};
    use crate::routing::Scope;
    use axum::http::Method;

    fn connection(addr: &str) -> Arc<Connection> {
        Arc::new(Connection::new(addr.parse().unwrap()))
    }

    fn context(conn: &Arc<Connection>, enabled: bool) -> RequestContext {
        let policy = if enabled {
            MaskingPolicy::from_merged(Toggle::On)
        } else {
            MaskingPolicy::DISABLED
        };
        RequestContext::new(
            Arc::clone(conn),
            Arc::new(Scope::new("test", policy, Default::default())),
            "req-1",
            Method::GET,
            "/",
        )
    }

    #[test]
    fn scenario_masks_then_restores() {
        let stage = MaskingStage::new(Arc::new(Placeholder::default()));
        let conn = connection("203.0.113.7:51000");
        assert_eq!(conn.visible_addr().text(), "203.0.113.7");

        let mut ctx = context(&conn, true);
        assert_eq!(stage.handle(&mut ctx).unwrap(), Flow::Continue);
        assert_eq!(conn.visible_addr().text(), "0.0.0.0");
        assert_eq!(
            conn.visible_addr().sockaddr(),
            "0.0.0.0:0".parse::<std::net::SocketAddr>().unwrap()
        );

        drop(ctx);
        assert_eq!(conn.visible_addr().text(), "203.0.113.7");
        assert_eq!(conn.visible_addr().sockaddr(), conn.peer_addr());
    }

    #[test]
    fn install_refuses_a_taken_slot() {
        let stage = MaskingStage::new(Arc::new(Placeholder::default()));
        let conn = connection("203.0.113.7:51000");
        let mut ctx = context(&conn, true);
        let before = conn.visible_addr();

        let held = RestorationGuard::new(IdentitySnapshot::capture(&conn).unwrap());
        assert!(ctx.attach_masking(held).is_ok());

        let err = stage.install(&mut ctx).unwrap_err();
        assert!(matches!(err, StageError::MaskingSlotTaken));
        assert!(Arc::ptr_eq(&conn.visible_addr(), &before));
        assert!(!stage.placeholder().is_installed_on(&conn));
    }

    #[test]
    fn repeated_invocations_mask_once() {
        let placeholder = Arc::new(Placeholder::default());
        let stage = Arc::new(MaskingStage::new(Arc::clone(&placeholder)));
        let engine = PhaseEngine::builder()
            .register(Phase::PostRead, stage.clone())
            .register(Phase::PreAccess, stage.clone())
            .build();

        let conn = connection("203.0.113.7:51000");
        let mut ctx = context(&conn, true);

        engine.run(Phase::PostRead, &mut ctx).unwrap();
        let first = ctx.masking().unwrap().original().unwrap().text().to_string();
        engine.run(Phase::PreAccess, &mut ctx).unwrap();
        stage.handle(&mut ctx).unwrap();

        // The snapshot still holds the real address, not the placeholder.
        assert_eq!(first, "203.0.113.7");
        assert_eq!(
            ctx.masking().unwrap().original().unwrap().text(),
            "203.0.113.7"
        );
        assert!(placeholder.is_installed_on(&conn));

        drop(ctx);
        assert_eq!(conn.visible_addr().text(), "203.0.113.7");
        assert!(!placeholder.is_installed_on(&conn));
    }

    #[test]
    fn disabled_scope_never_mutates() {
        let placeholder = Arc::new(Placeholder::default());
        let stage = MaskingStage::new(Arc::clone(&placeholder));
        let conn = connection("203.0.113.7:51000");
        let before = conn.visible_addr();

        let mut ctx = context(&conn, false);
        stage.handle(&mut ctx).unwrap();
        stage.handle(&mut ctx).unwrap();

        assert!(ctx.masking().is_none());
        assert!(Arc::ptr_eq(&conn.visible_addr(), &before));
        drop(ctx);
        assert!(Arc::ptr_eq(&conn.visible_addr(), &before));
    }

    #[test]
    fn installed_iff_snapshot_present() {
        let placeholder = Arc::new(Placeholder::default());
        let stage = MaskingStage::new(Arc::clone(&placeholder));
        let conn = connection("198.51.100.20:443");

        let mut ctx = context(&conn, true);
        assert_eq!(placeholder.is_installed_on(&conn), ctx.masking().is_some());
        stage.handle(&mut ctx).unwrap();
        assert_eq!(placeholder.is_installed_on(&conn), ctx.masking().is_some());
        assert!(ctx.masking().is_some());
    }

    #[test]
    fn keep_alive_requests_each_see_real_address_after_teardown() {
        let stage = MaskingStage::new(Arc::new(Placeholder::default()));
        let conn = connection("203.0.113.7:51000");

        let mut masked = context(&conn, true);
        stage.handle(&mut masked).unwrap();
        drop(masked);

        let mut plain = context(&conn, false);
        stage.handle(&mut plain).unwrap();
        assert_eq!(conn.visible_addr().text(), "203.0.113.7");
    }
}
