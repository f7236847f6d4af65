//! The flight state machine.
//!
//! A flight is scheduled by command, moved by explicit reschedules and by
//! weather, marked boarded once its boarding completes, and marked departed
//! and arrived by facts the tower imports. Actual timestamps are written
//! once and never change; redelivered facts are no-ops.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tarmac_core::{smallvec, Emitted, EventEnvelope, Machine, Reaction, Route};
use tracing::warn;

use crate::commands::{RescheduleFlight, ScheduleFlight};
use crate::facts::{AirportEvent, RescheduleReason, TemperatureSample, WindSample};
use crate::ids::{AircraftId, AirportCode, FlightId};

/// Longest single weather delay a policy may configure.
pub const MAX_DELAY_MINUTES: i64 = 24 * 60;

/// Weather rules that postpone flights which have not departed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReschedulePolicy {
    /// Azimuth change, in degrees, above which flights are postponed.
    pub wind_direction_threshold: f64,
    pub wind_direction_delay_minutes: i64,
    /// Wind speed above which flights are postponed.
    pub wind_speed_threshold: f64,
    pub wind_speed_delay_minutes: i64,
    /// Temperature change, in °C, above which flights are postponed.
    pub temperature_threshold: f64,
    pub temperature_delay_minutes: i64,
}

impl Default for ReschedulePolicy {
    fn default() -> Self {
        Self {
            wind_direction_threshold: 30.0,
            wind_direction_delay_minutes: 15,
            wind_speed_threshold: 150.0,
            wind_speed_delay_minutes: 30,
            temperature_threshold: 30.0,
            temperature_delay_minutes: 15,
        }
    }
}

impl ReschedulePolicy {
    /// A direction change wins over high speed; at most one delay applies.
    pub fn wind_delay(
        &self,
        previous: &WindSample,
        new: &WindSample,
    ) -> Option<(Duration, RescheduleReason)> {
        if (new.azimuth - previous.azimuth).abs() > self.wind_direction_threshold {
            delay(self.wind_direction_delay_minutes, RescheduleReason::WindDirection)
        } else if new.speed > self.wind_speed_threshold {
            delay(self.wind_speed_delay_minutes, RescheduleReason::WindSpeed)
        } else {
            None
        }
    }

    pub fn temperature_delay(
        &self,
        previous: &TemperatureSample,
        new: &TemperatureSample,
    ) -> Option<(Duration, RescheduleReason)> {
        if (new.celsius - previous.celsius).abs() > self.temperature_threshold {
            delay(self.temperature_delay_minutes, RescheduleReason::Temperature)
        } else {
            None
        }
    }
}

/// Minutes outside `0..=MAX_DELAY_MINUTES` postpone nothing.
fn delay(minutes: i64, reason: RescheduleReason) -> Option<(Duration, RescheduleReason)> {
    if !(0..=MAX_DELAY_MINUTES).contains(&minutes) {
        warn!(minutes, ?reason, "weather delay out of range, ignored");
        return None;
    }
    Some((Duration::minutes(minutes), reason))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Itinerary {
    pub aircraft: AircraftId,
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub scheduled_departure: DateTime<FixedOffset>,
    pub scheduled_arrival: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlightStatus {
    Scheduled,
    Boarded,
    Departed,
    Arrived,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Flight {
    itinerary: Option<Itinerary>,
    boarded_at: Option<DateTime<FixedOffset>>,
    actual_departure: Option<DateTime<FixedOffset>>,
    actual_arrival: Option<DateTime<FixedOffset>>,
}

impl Flight {
    pub fn itinerary(&self) -> Option<&Itinerary> {
        self.itinerary.as_ref()
    }

    pub fn scheduled_departure(&self) -> Option<DateTime<FixedOffset>> {
        self.itinerary.as_ref().map(|i| i.scheduled_departure)
    }

    pub fn scheduled_arrival(&self) -> Option<DateTime<FixedOffset>> {
        self.itinerary.as_ref().map(|i| i.scheduled_arrival)
    }

    pub fn boarded_at(&self) -> Option<DateTime<FixedOffset>> {
        self.boarded_at
    }

    pub fn actual_departure(&self) -> Option<DateTime<FixedOffset>> {
        self.actual_departure
    }

    pub fn actual_arrival(&self) -> Option<DateTime<FixedOffset>> {
        self.actual_arrival
    }

    pub fn has_departed(&self) -> bool {
        self.actual_departure.is_some()
    }

    pub fn has_arrived(&self) -> bool {
        self.actual_arrival.is_some()
    }

    pub fn status(&self) -> FlightStatus {
        if self.has_arrived() {
            FlightStatus::Arrived
        } else if self.has_departed() {
            FlightStatus::Departed
        } else if self.boarded_at.is_some() {
            FlightStatus::Boarded
        } else {
            FlightStatus::Scheduled
        }
    }

    fn postpone(
        &self,
        id: &FlightId,
        delay: Option<(Duration, RescheduleReason)>,
    ) -> Reaction<AirportEvent> {
        let (Some((delay, reason)), Some(itinerary)) = (delay, &self.itinerary) else {
            return Reaction::ignore();
        };
        if self.has_departed() {
            return Reaction::ignore();
        }
        let (Some(departure), Some(arrival)) = (
            itinerary.scheduled_departure.checked_add_signed(delay),
            itinerary.scheduled_arrival.checked_add_signed(delay),
        ) else {
            warn!(flight = %id, ?reason, "postponed schedule out of range, ignored");
            return Reaction::ignore();
        };
        Reaction::emit(AirportEvent::FlightRescheduled {
            flight: id.clone(),
            scheduled_departure: departure,
            scheduled_arrival: arrival,
            reason,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlightCommand {
    Schedule(ScheduleFlight),
    Reschedule(RescheduleFlight),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlightRejection {
    #[error("flight already departed at {0}")]
    AlreadyDeparted(DateTime<FixedOffset>),
}

impl Machine for Flight {
    type Id = FlightId;
    type Event = AirportEvent;
    type Command = FlightCommand;
    type Rejection = FlightRejection;
    type Context = ReschedulePolicy;

    const NAME: &'static str = "Flight";

    fn route(event: &AirportEvent) -> Route<FlightId> {
        match event {
            AirportEvent::WindSampleChanged { .. } | AirportEvent::TemperatureSampleChanged { .. } => {
                Route::Broadcast
            }
            AirportEvent::BoardingComplete { flight, .. }
            | AirportEvent::FlightDeparted { flight, .. }
            | AirportEvent::FlightArrived { flight, .. } => Route::Existing(flight.clone()),
            _ => Route::Ignore,
        }
    }

    fn command_route(command: &FlightCommand) -> Route<FlightId> {
        match command {
            FlightCommand::Schedule(cmd) => Route::Create(cmd.flight().clone()),
            FlightCommand::Reschedule(cmd) => Route::Existing(cmd.flight().clone()),
        }
    }

    fn decide(
        &self,
        id: &FlightId,
        envelope: &EventEnvelope<AirportEvent>,
        policy: &ReschedulePolicy,
    ) -> Reaction<AirportEvent> {
        match &envelope.event {
            AirportEvent::WindSampleChanged { previous, new, .. } => {
                self.postpone(id, policy.wind_delay(previous, new))
            }
            AirportEvent::TemperatureSampleChanged { previous, new, .. } => {
                self.postpone(id, policy.temperature_delay(previous, new))
            }
            AirportEvent::BoardingComplete { .. } => {
                // Boarding after take-off would break boarded-before-departed.
                if self.boarded_at.is_some() || self.has_departed() {
                    Reaction::ignore()
                } else {
                    Reaction::emit(AirportEvent::FlightBoarded {
                        flight: id.clone(),
                        when: envelope.occurred_at.fixed_offset(),
                    })
                }
            }
            AirportEvent::FlightDeparted { when, .. } => {
                if self.has_departed() {
                    return Reaction::ignore();
                }
                if let Some(boarded) = self.boarded_at.filter(|boarded| when < boarded) {
                    // Clocks of security and the tower disagree; the departure still stands.
                    warn!(
                        flight = %id,
                        departed = %when,
                        boarded = %boarded,
                        "departure recorded before boarding completed"
                    );
                }
                Reaction::accept()
            }
            AirportEvent::FlightArrived { .. } => {
                if self.has_arrived() || !self.has_departed() {
                    Reaction::ignore()
                } else {
                    Reaction::accept()
                }
            }
            _ => Reaction::ignore(),
        }
    }

    fn handle(
        &self,
        id: &FlightId,
        command: &FlightCommand,
        _: &ReschedulePolicy,
    ) -> Result<Emitted<AirportEvent>, FlightRejection> {
        match command {
            FlightCommand::Schedule(cmd) => Ok(smallvec![AirportEvent::FlightScheduled {
                flight: id.clone(),
                aircraft: cmd.aircraft().clone(),
                origin: cmd.origin().clone(),
                destination: cmd.destination().clone(),
                scheduled_departure: cmd.scheduled_departure(),
                scheduled_arrival: cmd.scheduled_arrival(),
            }]),
            FlightCommand::Reschedule(cmd) => {
                if let Some(departed) = self.actual_departure {
                    return Err(FlightRejection::AlreadyDeparted(departed));
                }
                Ok(smallvec![AirportEvent::FlightRescheduled {
                    flight: id.clone(),
                    scheduled_departure: cmd.departure(),
                    scheduled_arrival: cmd.arrival(),
                    reason: RescheduleReason::Requested,
                }])
            }
        }
    }

    fn apply(&mut self, event: &AirportEvent) {
        match event {
            AirportEvent::FlightScheduled {
                aircraft,
                origin,
                destination,
                scheduled_departure,
                scheduled_arrival,
                ..
            } => {
                self.itinerary = Some(Itinerary {
                    aircraft: aircraft.clone(),
                    origin: origin.clone(),
                    destination: destination.clone(),
                    scheduled_departure: *scheduled_departure,
                    scheduled_arrival: *scheduled_arrival,
                });
            }
            AirportEvent::FlightRescheduled {
                scheduled_departure,
                scheduled_arrival,
                ..
            } => {
                if let Some(itinerary) = self.itinerary.as_mut() {
                    itinerary.scheduled_departure = *scheduled_departure;
                    itinerary.scheduled_arrival = *scheduled_arrival;
                }
            }
            AirportEvent::FlightBoarded { when, .. } => {
                self.boarded_at.get_or_insert(*when);
            }
            AirportEvent::FlightDeparted { when, .. } => {
                self.actual_departure.get_or_insert(*when);
            }
            AirportEvent::FlightArrived { when, .. } => {
                self.actual_arrival.get_or_insert(*when);
            }
            _ => {}
        }
    }
}
