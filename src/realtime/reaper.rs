//! Periodic sweep for connections that died without a clean disconnect.
//!
//! The actor's ping/pong keepalive catches most silent deaths; the reaper
//! covers the rest by scanning the registry for connections whose channel
//! has closed and running them through the normal disconnect path, so
//! registry cleanup and the presence broadcast still happen exactly once.

use std::time::Duration;
use tokio::time::interval;

use super::router;
use crate::state::AppState;

/// Remove registry entries whose transport channel is closed.
/// Idempotent against clean disconnects racing the sweep: a connection
/// already unregistered is skipped without a broadcast. Returns the number
/// of connections reaped.
pub fn sweep_stale_connections(state: &AppState) -> usize {
    let stale = state.registry.stale_connections();
    let reaped = stale.len();

    for (user_id, connection_id) in stale {
        tracing::warn!(
            user_id = %user_id,
            connection_id = %connection_id,
            "Reaping stale connection"
        );
        router::handle_disconnect(state, &user_id, connection_id);
    }

    reaped
}

/// Spawn the background reaper task running at the configured period.
pub fn spawn_reaper(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut timer = interval(period);
        // Skip the first immediate tick
        timer.tick().await;

        loop {
            timer.tick().await;
            let reaped = sweep_stale_connections(&state);
            if reaped > 0 {
                tracing::info!(reaped, "Stale connection sweep complete");
            }
        }
    });
}
