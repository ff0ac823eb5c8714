use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::ingest::cycle::run_cycle;
use crate::storage::Database;

// ============================================================================
// Interval Parsing
// ============================================================================

/// A bad `agg` interval argument. Fatal at startup; the scheduler itself
/// never sees an invalid period.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("invalid interval '{0}': expected a number with a ms, s, m, or h suffix")]
    Malformed(String),

    #[error("interval must be greater than zero")]
    Zero,
}

/// Parse an interval string like `500ms`, `30s`, `5m`, or `2h`.
pub fn parse_interval(raw: &str) -> Result<Duration, IntervalError> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| IntervalError::Malformed(raw.to_string()))?;
    let (digits, unit) = trimmed.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| IntervalError::Malformed(raw.to_string()))?;
    let unit_millis: u64 = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        _ => return Err(IntervalError::Malformed(raw.to_string())),
    };

    let millis = value
        .checked_mul(unit_millis)
        .ok_or_else(|| IntervalError::Malformed(raw.to_string()))?;
    if millis == 0 {
        return Err(IntervalError::Zero);
    }
    Ok(Duration::from_millis(millis))
}

// ============================================================================
// Scheduler
// ============================================================================

/// Drive ingestion cycles at a fixed period until `shutdown` fires.
///
/// The first cycle runs immediately; after that the timer fires every
/// `period` regardless of how long cycles take. Cycles are spawned into a
/// `JoinSet` rather than awaited inline, so a slow feed never delays the
/// next tick — overlapping cycles are tolerated because each one operates
/// on a single feed and post URLs are unique.
///
/// Shutdown is cooperative: the timer stops as soon as the signal is
/// observed, then in-flight cycles are drained rather than aborted.
pub async fn run_scheduler(
    db: Database,
    client: reqwest::Client,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles = JoinSet::new();

    tracing::info!(period_ms = period.as_millis() as u64, "Aggregator started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let db = db.clone();
                let client = client.clone();
                cycles.spawn(async move { run_cycle(&db, &client).await });
            }
            Some(joined) = cycles.join_next() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Ingestion cycle panicked");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!(in_flight = cycles.len(), "Shutdown signal received");
    while let Some(joined) = cycles.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Ingestion cycle panicked");
        }
    }
    tracing::info!("Aggregator stopped");
}
