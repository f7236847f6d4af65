//! Commands accepted from callers.
//!
//! Every command validates its required fields when it is built, so a value
//! that exists is always well-formed.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::ids::{AircraftId, AirportCode, FlightId};

/// A command value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("arrival {arrival} is not after departure {departure}")]
    ArrivalNotAfterDeparture {
        departure: DateTime<FixedOffset>,
        arrival: DateTime<FixedOffset>,
    },

    #[error("origin and destination are both {0}")]
    SameEndpoints(AirportCode),
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

fn require_order(
    departure: DateTime<FixedOffset>,
    arrival: DateTime<FixedOffset>,
) -> Result<(), ValidationError> {
    if arrival > departure {
        Ok(())
    } else {
        Err(ValidationError::ArrivalNotAfterDeparture { departure, arrival })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleFlight {
    flight: FlightId,
    aircraft: AircraftId,
    origin: AirportCode,
    destination: AirportCode,
    scheduled_departure: DateTime<FixedOffset>,
    scheduled_arrival: DateTime<FixedOffset>,
}

impl ScheduleFlight {
    pub fn new(
        flight: FlightId,
        aircraft: AircraftId,
        origin: AirportCode,
        destination: AirportCode,
        scheduled_departure: DateTime<FixedOffset>,
        scheduled_arrival: DateTime<FixedOffset>,
    ) -> Result<Self, ValidationError> {
        require("flight id", flight.as_str())?;
        require("aircraft id", aircraft.as_str())?;
        require("origin", origin.as_str())?;
        require("destination", destination.as_str())?;
        if origin == destination {
            return Err(ValidationError::SameEndpoints(origin));
        }
        require_order(scheduled_departure, scheduled_arrival)?;

        Ok(Self {
            flight,
            aircraft,
            origin,
            destination,
            scheduled_departure,
            scheduled_arrival,
        })
    }

    pub fn flight(&self) -> &FlightId {
        &self.flight
    }

    pub fn aircraft(&self) -> &AircraftId {
        &self.aircraft
    }

    pub fn origin(&self) -> &AirportCode {
        &self.origin
    }

    pub fn destination(&self) -> &AirportCode {
        &self.destination
    }

    pub fn scheduled_departure(&self) -> DateTime<FixedOffset> {
        self.scheduled_departure
    }

    pub fn scheduled_arrival(&self) -> DateTime<FixedOffset> {
        self.scheduled_arrival
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescheduleFlight {
    flight: FlightId,
    departure: DateTime<FixedOffset>,
    arrival: DateTime<FixedOffset>,
}

impl RescheduleFlight {
    pub fn new(
        flight: FlightId,
        departure: DateTime<FixedOffset>,
        arrival: DateTime<FixedOffset>,
    ) -> Result<Self, ValidationError> {
        require("flight id", flight.as_str())?;
        require_order(departure, arrival)?;
        Ok(Self {
            flight,
            departure,
            arrival,
        })
    }

    pub fn flight(&self) -> &FlightId {
        &self.flight
    }

    pub fn departure(&self) -> DateTime<FixedOffset> {
        self.departure
    }

    pub fn arrival(&self) -> DateTime<FixedOffset> {
        self.arrival
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterAircraft {
    aircraft: AircraftId,
}

impl RegisterAircraft {
    pub fn new(aircraft: AircraftId) -> Result<Self, ValidationError> {
        require("aircraft id", aircraft.as_str())?;
        Ok(Self { aircraft })
    }

    pub fn aircraft(&self) -> &AircraftId {
        &self.aircraft
    }
}

/// Supplies the headcount a flight's boarding waits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectPassengers {
    flight: FlightId,
    count: usize,
}

impl ExpectPassengers {
    pub fn new(flight: FlightId, count: usize) -> Result<Self, ValidationError> {
        require("flight id", flight.as_str())?;
        Ok(Self { flight, count })
    }

    pub fn flight(&self) -> &FlightId {
        &self.flight
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarmac_testing::clock::hm;

    #[test]
    fn test_schedule_requires_arrival_after_departure() {
        let err = ScheduleFlight::new(
            "PS-101".into(),
            "UR-PSA".into(),
            "HRK".into(),
            "KBP".into(),
            hm(12, 0),
            hm(10, 0),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::ArrivalNotAfterDeparture {
                departure: hm(12, 0),
                arrival: hm(10, 0),
            }
        );
    }

    #[test]
    fn test_schedule_rejects_blank_ids_and_loops() {
        let blank = ScheduleFlight::new(
            " ".into(),
            "UR-PSA".into(),
            "HRK".into(),
            "KBP".into(),
            hm(10, 0),
            hm(12, 0),
        );
        assert_eq!(blank.unwrap_err(), ValidationError::Empty { field: "flight id" });

        let round_trip = ScheduleFlight::new(
            "PS-101".into(),
            "UR-PSA".into(),
            "HRK".into(),
            "HRK".into(),
            hm(10, 0),
            hm(12, 0),
        );
        assert_eq!(
            round_trip.unwrap_err(),
            ValidationError::SameEndpoints("HRK".into())
        );
    }

    #[test]
    fn test_reschedule_validates_order() {
        assert!(RescheduleFlight::new("PS-101".into(), hm(10, 0), hm(10, 0)).is_err());
        let ok = RescheduleFlight::new("PS-101".into(), hm(11, 0), hm(13, 0)).unwrap();
        assert_eq!(ok.departure(), hm(11, 0));
    }
}
