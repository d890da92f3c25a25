//! The per-session liveness watchdog.

use std::sync::Arc;

use tablesync_protocol::{server_timestamp, ErrorCode, ServerEvent};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::{SessionConfig, SessionId, SessionManager};

/// Probes one session until it dies.
///
/// On every probe interval the watchdog checks how long the session has
/// been silent. Past the liveness timeout it sends a single recoverable
/// `timeout` error followed by a close marker, then exits. While the
/// session is alive it pushes a heartbeat notice so the client can observe
/// server liveness too.
///
/// The task exits on its own once the session is deregistered; deregister
/// also aborts it, whichever comes first.
pub async fn run_watchdog(
    manager: Arc<Mutex<SessionManager>>,
    id: SessionId,
    config: SessionConfig,
) {
    let mut probe = tokio::time::interval(config.probe_interval);
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so the first probe
    // lands a full interval after registration.
    probe.tick().await;

    loop {
        probe.tick().await;
        let mgr = manager.lock().await;
        let Some(idle) = mgr.idle_for(id) else {
            return;
        };

        if idle >= config.liveness_timeout {
            tracing::info!(
                session_id = %id,
                idle_ms = idle.as_millis() as u64,
                "session liveness timeout, disconnecting"
            );
            let _ = mgr.send_to(
                id,
                ServerEvent::error(
                    ErrorCode::Timeout,
                    "no activity within the liveness window",
                    true,
                ),
            );
            let _ = mgr.close(id);
            return;
        }

        let _ = mgr.send_to(
            id,
            ServerEvent::Heartbeat {
                timestamp: server_timestamp(),
                pending_actions: 0,
            },
        );
    }
}

// =========================================================================
// Tests
// =========================================================================
