//! Polling external sources into the airport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ExternalFact, IntakeError};
use crate::airport::Airport;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

/// A system that reports facts when polled.
///
/// A source keeps whatever cursor it needs between polls, so each poll
/// returns only facts not reported before, oldest first.
#[async_trait]
pub trait FactSource: Send {
    fn name(&self) -> &str;

    async fn poll(&mut self) -> Result<Vec<ExternalFact>, SourceError>;
}

/// Shorter poll intervals passed to [`run_source`] are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Counters of one [`run_source`] loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub polls: u64,
    pub failed_polls: u64,
    pub applied: u64,
    pub rejected: u64,
}

/// Poll `source` every `interval` and hand each fact to the airport.
///
/// A failed poll is logged and retried on the next interval. A rejected
/// fact is logged and skipped. The first poll happens immediately.
pub async fn run_source<S: FactSource>(
    mut source: S,
    airport: Arc<Airport>,
    interval: Duration,
    shutdown: CancellationToken,
) -> SourceStats {
    if interval < MIN_POLL_INTERVAL {
        warn!(
            source = source.name(),
            requested_ms = interval.as_millis() as u64,
            "poll interval too short, using minimum"
        );
    }
    let interval = interval.max(MIN_POLL_INTERVAL);

    info!(
        source = source.name(),
        interval_secs = interval.as_secs(),
        "source starting"
    );

    let mut stats = SourceStats::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            _ = ticker.tick() => {
                stats.polls += 1;
                let facts = match source.poll().await {
                    Ok(facts) => facts,
                    Err(e) => {
                        stats.failed_polls += 1;
                        warn!(source = source.name(), error = %e, "poll failed");
                        continue;
                    }
                };

                for fact in facts {
                    let kind = fact.kind();
                    match airport.receive(fact) {
                        Ok(settled) => {
                            stats.applied += 1;
                            debug!(source = source.name(), kind, derived = settled.len(), "fact applied");
                        }
                        Err(e) => {
                            stats.rejected += 1;
                            warn!(source = source.name(), kind, error = %e, "fact rejected");
                        }
                    }
                }
            }
        }
    }

    info!(
        source = source.name(),
        polls = stats.polls,
        applied = stats.applied,
        rejected = stats.rejected,
        "source stopped"
    );
    stats
}
