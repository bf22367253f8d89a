use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use tracing::{error, info};

use crate::calc::summary::retention_cutoff;
use crate::utils::local_time::local_today;

/// Delete attendance records dated before the retention cutoff.
/// Returns the number of rows removed.
pub async fn prune_old_records(pool: &PgPool, tz: &str, months: u32) -> Result<u64> {
    let today = local_today(pool, tz).await?;
    let cutoff = retention_cutoff(today, months);

    let result = sqlx::query("DELETE FROM attendance_records WHERE date < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    info!(%cutoff, removed = result.rows_affected(), "Pruned old attendance records");
    Ok(result.rows_affected())
}

/// Runs [`prune_old_records`] forever on a fixed interval.
pub async fn run_pruner(pool: PgPool, tz: String, months: u32, every: Duration) {
    let mut ticker = actix_web::rt::time::interval(every);
    loop {
        ticker.tick().await;
        if let Err(e) = prune_old_records(&pool, &tz, months).await {
            error!(error = %e, "Failed to prune old attendance records");
        }
    }
}
