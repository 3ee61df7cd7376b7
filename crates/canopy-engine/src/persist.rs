//! Periodic flush of the store's outbox to `PostgreSQL`.
//!
//! Each pass drains every row written since the previous pass and writes
//! it in one [`flush_changes`] call. A failed pass puts the whole batch
//! back in front of anything written meanwhile; the next pass retries it.
//! A last pass runs after shutdown so nothing written before the stop
//! signal is lost.

use std::sync::Arc;
use std::time::Duration;

use canopy_core::{GameStore, Shutdown};
use canopy_db::flush_changes;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Drain the outbox and write it. Returns the number of rows written.
///
/// On failure the drained rows are re-queued before the error is returned.
pub async fn flush_once<S: GameStore>(store: &S, pool: &PgPool) -> Result<usize, EngineError> {
    let changes = store.drain_changes()?;
    if changes.is_empty() {
        return Ok(0);
    }

    match flush_changes(pool, &changes).await {
        Ok(rows) => {
            debug!(rows, "persist pass complete");
            Ok(rows)
        }
        Err(err) => {
            warn!(error = %err, rows = changes.row_count(), "persist pass failed, re-queueing");
            store.requeue(changes)?;
            Err(err.into())
        }
    }
}

/// Flush every `period_secs` until `shutdown` fires, then flush once more.
pub fn spawn_persist_loop<S: GameStore + 'static>(
    store: Arc<S>,
    pool: PgPool,
    period_secs: u64,
    shutdown: Arc<Shutdown>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(period_secs.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = interval.tick() => {
                    // Failures are logged and retried on the next tick.
                    let _ = flush_once(store.as_ref(), &pool).await;
                }
            }
        }

        match flush_once(store.as_ref(), &pool).await {
            Ok(rows) => info!(rows, "final persist pass complete"),
            Err(err) => warn!(error = %err, "final persist pass failed, unsaved rows lost"),
        }
    })
}
