//! The tower: periodic inference of departures and arrivals.
//!
//! Nothing reports take-offs and landings directly. Once per interval the
//! tower reads every flight and infers at most one arrival and one departure:
//!
//! - a flight that departed but has not arrived is marked arrived,
//! - a flight that has neither departed nor arrived is marked departed.
//!
//! Among several candidates the tower picks the flight with the earliest
//! scheduled time (arrival or departure respectively), then the lowest id.
//! The snapshot may be slightly stale; inferred facts go through the same
//! intake as everything else, so a flight that moved meanwhile just ignores
//! them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use tarmac_core::Origin;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::airport::{AirportError, Facts};
use crate::facts::AirportEvent;
use crate::flight::Flight;
use crate::ids::{AirportCode, FlightId};

pub const DEFAULT_TOWER_INTERVAL: Duration = Duration::from_secs(60);
/// Shorter intervals passed to [`Tower::with_interval`] are raised to this.
pub const MIN_TOWER_INTERVAL: Duration = Duration::from_secs(1);

/// What the tower watches and where it records what it infers.
pub trait Airspace: Send + Sync {
    /// Every known flight.
    fn flights(&self) -> Result<Vec<(FlightId, Flight)>, SnapshotError>;

    fn import(
        &self,
        origin: &Origin,
        at: DateTime<Utc>,
        event: AirportEvent,
    ) -> Result<Facts, AirportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("flight snapshot unavailable: {0}")]
pub struct SnapshotError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum TowerError {
    #[error("tower is closed")]
    Closed,

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// What one tick recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub arrived: Option<FlightId>,
    pub departed: Option<FlightId>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.arrived.is_none() && self.departed.is_none()
    }
}

/// The flights one tick acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub arrival: Option<FlightId>,
    pub departure: Option<FlightId>,
}

/// Pick at most one flight to land and one to take off.
///
/// Flights that already arrived, or were never scheduled, are not
/// candidates.
pub fn select(flights: &[(FlightId, Flight)]) -> Selection {
    let mut arrival: Option<(DateTime<FixedOffset>, &FlightId)> = None;
    let mut departure: Option<(DateTime<FixedOffset>, &FlightId)> = None;

    for (id, flight) in flights {
        let Some(itinerary) = flight.itinerary() else {
            continue;
        };
        if flight.has_arrived() {
            continue;
        }

        let (best, key) = if flight.has_departed() {
            (&mut arrival, (itinerary.scheduled_arrival, id))
        } else {
            (&mut departure, (itinerary.scheduled_departure, id))
        };
        if best.map_or(true, |current| key < current) {
            *best = Some(key);
        }
    }

    Selection {
        arrival: arrival.map(|(_, id)| id.clone()),
        departure: departure.map(|(_, id)| id.clone()),
    }
}

pub struct Tower<A: Airspace> {
    airspace: Arc<A>,
    origin: Origin,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<A: Airspace> Tower<A> {
    pub fn new(airspace: Arc<A>, code: &AirportCode) -> Self {
        Self {
            airspace,
            origin: Origin::new(format!("Tower {code}")),
            interval: DEFAULT_TOWER_INTERVAL,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_TOWER_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "tower interval too short, using minimum"
            );
        }
        self.interval = interval.max(MIN_TOWER_INTERVAL);
        self
    }

    /// Stop on an external token instead of only on [`close`](Self::close).
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Token that closes this tower when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// No tick starts after this; a tick already running completes.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn tick(&self) -> Result<TickReport, TowerError> {
        self.tick_at(Utc::now())
    }

    /// Run one inference pass as of `now`.
    ///
    /// The arrival is recorded before the departure. A failed import is
    /// logged and leaves its slot of the report empty.
    pub fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport, TowerError> {
        if self.is_closed() {
            return Err(TowerError::Closed);
        }

        let flights = self.airspace.flights()?;
        let selection = select(&flights);
        let when = now.fixed_offset();

        let arrived = selection.arrival.filter(|flight| {
            self.record(
                now,
                AirportEvent::FlightArrived {
                    flight: flight.clone(),
                    when,
                },
            )
        });
        let departed = selection.departure.filter(|flight| {
            self.record(
                now,
                AirportEvent::FlightDeparted {
                    flight: flight.clone(),
                    when,
                },
            )
        });

        Ok(TickReport { arrived, departed })
    }

    fn record(&self, now: DateTime<Utc>, event: AirportEvent) -> bool {
        let kind = tarmac_core::Event::kind(&event);
        let flight = event.subject();
        match self.airspace.import(&self.origin, now, event) {
            Ok(_) => {
                info!(flight = %flight, kind, at = %now, "tower recorded");
                true
            }
            Err(e) => {
                warn!(flight = %flight, kind, at = %now, error = %e, "tower import failed");
                false
            }
        }
    }

    /// Tick every interval until closed.
    ///
    /// The first tick happens one interval after start.
    pub async fn run(self) {
        info!(
            origin = %self.origin,
            interval_secs = self.interval.as_secs(),
            "tower starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!(origin = %self.origin, "tower shutting down");
                    break;
                }

                _ = interval.tick() => {
                    match self.tick() {
                        Ok(report) if report.is_empty() => debug!("tower tick, nothing to infer"),
                        Ok(_) => {}
                        Err(TowerError::Closed) => break,
                        Err(e) => warn!(error = %e, "tower tick skipped"),
                    }
                }
            }
        }
    }
}
