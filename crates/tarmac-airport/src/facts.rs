//! Every fact the airport machines consume or emit.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tarmac_core::Event;

use crate::ids::{AircraftId, AirportCode, FlightId, PassengerId};

/// Wind as measured by a weather station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub speed: f64,
    /// Direction the wind blows from, in degrees.
    pub azimuth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    pub celsius: f64,
}

/// Why a flight's schedule moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RescheduleReason {
    Requested,
    WindDirection,
    WindSpeed,
    Temperature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AirportEvent {
    // Flight
    FlightScheduled {
        flight: FlightId,
        aircraft: AircraftId,
        origin: AirportCode,
        destination: AirportCode,
        scheduled_departure: DateTime<FixedOffset>,
        scheduled_arrival: DateTime<FixedOffset>,
    },
    FlightRescheduled {
        flight: FlightId,
        scheduled_departure: DateTime<FixedOffset>,
        scheduled_arrival: DateTime<FixedOffset>,
        reason: RescheduleReason,
    },
    FlightBoarded {
        flight: FlightId,
        when: DateTime<FixedOffset>,
    },
    FlightDeparted {
        flight: FlightId,
        when: DateTime<FixedOffset>,
    },
    FlightArrived {
        flight: FlightId,
        when: DateTime<FixedOffset>,
    },

    // Aircraft
    AircraftRegistered {
        aircraft: AircraftId,
    },
    AircraftPreflightCheckComplete {
        aircraft: AircraftId,
    },
    AircraftPrepared {
        aircraft: AircraftId,
    },

    // Boarding
    PassengersExpected {
        flight: FlightId,
        count: usize,
    },
    PassengerBoarded {
        flight: FlightId,
        passenger: PassengerId,
    },
    PassengerDeniedBoarding {
        flight: FlightId,
        passenger: PassengerId,
    },
    BoardingComplete {
        flight: FlightId,
        headcount: usize,
    },

    // Weather
    WindSampleChanged {
        station: AirportCode,
        previous: WindSample,
        new: WindSample,
    },
    TemperatureSampleChanged {
        station: AirportCode,
        previous: TemperatureSample,
        new: TemperatureSample,
    },
}

impl Event for AirportEvent {
    fn kind(&self) -> &'static str {
        match self {
            AirportEvent::FlightScheduled { .. } => "FlightScheduled",
            AirportEvent::FlightRescheduled { .. } => "FlightRescheduled",
            AirportEvent::FlightBoarded { .. } => "FlightBoarded",
            AirportEvent::FlightDeparted { .. } => "FlightDeparted",
            AirportEvent::FlightArrived { .. } => "FlightArrived",
            AirportEvent::AircraftRegistered { .. } => "AircraftRegistered",
            AirportEvent::AircraftPreflightCheckComplete { .. } => {
                "AircraftPreflightCheckComplete"
            }
            AirportEvent::AircraftPrepared { .. } => "AircraftPrepared",
            AirportEvent::PassengersExpected { .. } => "PassengersExpected",
            AirportEvent::PassengerBoarded { .. } => "PassengerBoarded",
            AirportEvent::PassengerDeniedBoarding { .. } => "PassengerDeniedBoarding",
            AirportEvent::BoardingComplete { .. } => "BoardingComplete",
            AirportEvent::WindSampleChanged { .. } => "WindSampleChanged",
            AirportEvent::TemperatureSampleChanged { .. } => "TemperatureSampleChanged",
        }
    }
}

impl AirportEvent {
    /// Id of the entity the fact is about, for logs and diagnostics.
    pub fn subject(&self) -> String {
        match self {
            AirportEvent::FlightScheduled { flight, .. }
            | AirportEvent::FlightRescheduled { flight, .. }
            | AirportEvent::FlightBoarded { flight, .. }
            | AirportEvent::FlightDeparted { flight, .. }
            | AirportEvent::FlightArrived { flight, .. }
            | AirportEvent::PassengersExpected { flight, .. }
            | AirportEvent::PassengerBoarded { flight, .. }
            | AirportEvent::PassengerDeniedBoarding { flight, .. }
            | AirportEvent::BoardingComplete { flight, .. } => flight.to_string(),
            AirportEvent::AircraftRegistered { aircraft }
            | AirportEvent::AircraftPreflightCheckComplete { aircraft }
            | AirportEvent::AircraftPrepared { aircraft } => aircraft.to_string(),
            AirportEvent::WindSampleChanged { station, .. }
            | AirportEvent::TemperatureSampleChanged { station, .. } => station.to_string(),
        }
    }
}
