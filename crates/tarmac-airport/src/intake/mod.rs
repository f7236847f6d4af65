//! External fact intake.
//!
//! Adapters for the weather station, airport security and airplane supplies
//! translate their own payloads into [`ExternalFact`]s. A fact that arrives
//! over the wire as a [`FactRecord`] is checked here before it reaches the
//! machines, so malformed input never becomes an event.

pub mod security;
pub mod source;
pub mod supplies;
pub mod weather;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tarmac_core::{EventEnvelope, Origin};
use uuid::Uuid;

use crate::facts::{AirportEvent, TemperatureSample, WindSample};
use crate::ids::{AircraftId, AirportCode, FlightId, PassengerId};

/// The facts the airport accepts from external systems.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalEvent {
    AircraftPreflightCheckComplete {
        aircraft: AircraftId,
    },
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
    PassengerBoarded {
        flight: FlightId,
        passenger: PassengerId,
    },
    PassengerDeniedBoarding {
        flight: FlightId,
        passenger: PassengerId,
    },
}

impl From<ExternalEvent> for AirportEvent {
    fn from(event: ExternalEvent) -> Self {
        match event {
            ExternalEvent::AircraftPreflightCheckComplete { aircraft } => {
                AirportEvent::AircraftPreflightCheckComplete { aircraft }
            }
            ExternalEvent::WindSampleChanged {
                station,
                previous,
                new,
            } => AirportEvent::WindSampleChanged {
                station,
                previous,
                new,
            },
            ExternalEvent::TemperatureSampleChanged {
                station,
                previous,
                new,
            } => AirportEvent::TemperatureSampleChanged {
                station,
                previous,
                new,
            },
            ExternalEvent::PassengerBoarded { flight, passenger } => {
                AirportEvent::PassengerBoarded { flight, passenger }
            }
            ExternalEvent::PassengerDeniedBoarding { flight, passenger } => {
                AirportEvent::PassengerDeniedBoarding { flight, passenger }
            }
        }
    }
}

/// Namespace of the name-based ids given to external facts.
const FACT_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_43a2_9d0e_4b7a_8e55_2f30_b1c4_d981);

/// An external fact tagged with who observed it and when.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFact {
    pub origin: Origin,
    pub occurred_at: DateTime<Utc>,
    pub event: ExternalEvent,
}

impl ExternalFact {
    pub fn new(origin: Origin, occurred_at: DateTime<Utc>, event: ExternalEvent) -> Self {
        Self {
            origin,
            occurred_at,
            event,
        }
    }

    /// Check a wire record and turn it into a typed fact.
    pub fn from_record(origin: Origin, record: FactRecord) -> Result<Self, IntakeError> {
        if record.subject_id.trim().is_empty() {
            return Err(IntakeError::EmptySubject { kind: record.kind });
        }

        let event = match record.kind.as_str() {
            "AircraftPreflightCheckComplete" => ExternalEvent::AircraftPreflightCheckComplete {
                aircraft: record.subject_id.into(),
            },
            "WindSampleChanged" => {
                let change: Change<WindSample> = payload(&record)?;
                ExternalEvent::WindSampleChanged {
                    station: record.subject_id.into(),
                    previous: change.previous,
                    new: change.new,
                }
            }
            "TemperatureSampleChanged" => {
                let change: Change<TemperatureSample> = payload(&record)?;
                ExternalEvent::TemperatureSampleChanged {
                    station: record.subject_id.into(),
                    previous: change.previous,
                    new: change.new,
                }
            }
            "PassengerBoarded" => {
                let outcome: Passenger = payload(&record)?;
                ExternalEvent::PassengerBoarded {
                    flight: record.subject_id.into(),
                    passenger: outcome.passenger,
                }
            }
            "PassengerDeniedBoarding" => {
                let outcome: Passenger = payload(&record)?;
                ExternalEvent::PassengerDeniedBoarding {
                    flight: record.subject_id.into(),
                    passenger: outcome.passenger,
                }
            }
            _ => return Err(IntakeError::UnknownKind(record.kind.clone())),
        };

        Ok(Self::new(origin, record.occurred_at, event))
    }

    pub fn kind(&self) -> &'static str {
        match self.event {
            ExternalEvent::AircraftPreflightCheckComplete { .. } => {
                "AircraftPreflightCheckComplete"
            }
            ExternalEvent::WindSampleChanged { .. } => "WindSampleChanged",
            ExternalEvent::TemperatureSampleChanged { .. } => "TemperatureSampleChanged",
            ExternalEvent::PassengerBoarded { .. } => "PassengerBoarded",
            ExternalEvent::PassengerDeniedBoarding { .. } => "PassengerDeniedBoarding",
        }
    }

    /// Stable identity of this fact.
    ///
    /// Derived from kind, subject, occurrence time and payload, so every
    /// delivery of the same observation gets the same id whatever adapter
    /// relays it.
    pub fn fact_id(&self) -> Uuid {
        let payload = match &self.event {
            ExternalEvent::AircraftPreflightCheckComplete { aircraft } => aircraft.to_string(),
            ExternalEvent::WindSampleChanged {
                station,
                previous,
                new,
            } => format!(
                "{station}|{:x}|{:x}|{:x}|{:x}",
                previous.speed.to_bits(),
                previous.azimuth.to_bits(),
                new.speed.to_bits(),
                new.azimuth.to_bits(),
            ),
            ExternalEvent::TemperatureSampleChanged {
                station,
                previous,
                new,
            } => format!(
                "{station}|{:x}|{:x}",
                previous.celsius.to_bits(),
                new.celsius.to_bits()
            ),
            ExternalEvent::PassengerBoarded { flight, passenger }
            | ExternalEvent::PassengerDeniedBoarding { flight, passenger } => {
                format!("{flight}|{passenger}")
            }
        };
        let name = format!(
            "{}|{}|{payload}",
            self.kind(),
            self.occurred_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
        );
        Uuid::new_v5(&FACT_NAMESPACE, name.as_bytes())
    }

    pub fn into_envelope(self) -> EventEnvelope<AirportEvent> {
        let id = self.fact_id();
        EventEnvelope::new(self.origin, self.occurred_at, self.event.into()).with_id(id)
    }
}

/// A fact as delivered by an adapter over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactRecord {
    pub kind: String,
    pub subject_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Change<T> {
    previous: T,
    new: T,
}

#[derive(Debug, Deserialize)]
struct Passenger {
    passenger: PassengerId,
}

fn payload<T: serde::de::DeserializeOwned>(record: &FactRecord) -> Result<T, IntakeError> {
    T::deserialize(&record.payload).map_err(|source| IntakeError::Payload {
        kind: record.kind.clone(),
        source,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("unknown fact kind {0:?}")]
    UnknownKind(String),

    #[error("{kind} has an empty subject id")]
    EmptySubject { kind: String },

    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tarmac_testing::clock::instant;

    fn record(kind: &str, subject: &str, payload: serde_json::Value) -> FactRecord {
        FactRecord {
            kind: kind.to_owned(),
            subject_id: subject.to_owned(),
            occurred_at: instant(9, 0),
            payload,
        }
    }

    #[test]
    fn test_wire_record_parses_from_json() {
        let record: FactRecord = serde_json::from_str(
            r#"{
                "kind": "WindSampleChanged",
                "subjectId": "HRK",
                "occurredAt": "2020-06-01T09:00:00Z",
                "payload": {
                    "previous": {"speed": 10.0, "azimuth": 20.0},
                    "new": {"speed": 12.0, "azimuth": 70.0}
                }
            }"#,
        )
        .unwrap();

        let fact = ExternalFact::from_record(Origin::new("Weather"), record).unwrap();

        assert_eq!(fact.occurred_at, instant(9, 0));
        assert_eq!(
            fact.event,
            ExternalEvent::WindSampleChanged {
                station: "HRK".into(),
                previous: WindSample {
                    speed: 10.0,
                    azimuth: 20.0
                },
                new: WindSample {
                    speed: 12.0,
                    azimuth: 70.0
                },
            }
        );
    }

    #[test]
    fn test_preflight_needs_no_payload() {
        let fact = ExternalFact::from_record(
            Origin::new("Airplane Supplies"),
            record("AircraftPreflightCheckComplete", "UR-PSA", serde_json::Value::Null),
        )
        .unwrap();
        assert_eq!(fact.kind(), "AircraftPreflightCheckComplete");
        assert_eq!(
            fact.into_envelope().event,
            AirportEvent::AircraftPreflightCheckComplete {
                aircraft: "UR-PSA".into()
            }
        );
    }

    #[test]
    fn test_passenger_outcome_uses_subject_as_flight() {
        let fact = ExternalFact::from_record(
            Origin::new("Airport Security"),
            record("PassengerDeniedBoarding", "PS-101", json!({"passenger": "p-7"})),
        )
        .unwrap();
        assert_eq!(
            fact.event,
            ExternalEvent::PassengerDeniedBoarding {
                flight: "PS-101".into(),
                passenger: "p-7".into(),
            }
        );
    }

    #[test]
    fn test_same_observation_gets_same_id() {
        let wind = |azimuth: f64, origin: &str| {
            ExternalFact::from_record(
                Origin::new(origin),
                record(
                    "WindSampleChanged",
                    "HRK",
                    json!({
                        "previous": {"speed": 10.0, "azimuth": 20.0},
                        "new": {"speed": 10.0, "azimuth": azimuth}
                    }),
                ),
            )
            .unwrap()
        };

        let first = wind(70.0, "Weather");
        assert_eq!(first.fact_id(), wind(70.0, "Weather").fact_id());
        assert_eq!(first.fact_id(), wind(70.0, "Weather relay").fact_id());
        assert_ne!(first.fact_id(), wind(71.0, "Weather").fact_id());
        assert_eq!(first.clone().into_envelope().id, first.fact_id());

        let boarded = ExternalFact::new(
            Origin::new("Airport Security"),
            instant(9, 0),
            ExternalEvent::PassengerBoarded {
                flight: "PS-101".into(),
                passenger: "p-1".into(),
            },
        );
        let denied = ExternalFact::new(
            Origin::new("Airport Security"),
            instant(9, 0),
            ExternalEvent::PassengerDeniedBoarding {
                flight: "PS-101".into(),
                passenger: "p-1".into(),
            },
        );
        let later = ExternalFact {
            occurred_at: instant(9, 1),
            ..boarded.clone()
        };
        assert_ne!(boarded.fact_id(), denied.fact_id());
        assert_ne!(boarded.fact_id(), later.fact_id());
    }

    #[test]
    fn test_rejects_unknown_kinds_and_bad_payloads() {
        let origin = Origin::new("Somewhere");

        let err = ExternalFact::from_record(origin.clone(), record("FlightDeparted", "F1", json!({})))
            .unwrap_err();
        assert!(matches!(err, IntakeError::UnknownKind(kind) if kind == "FlightDeparted"));

        let err = ExternalFact::from_record(
            origin.clone(),
            record("TemperatureSampleChanged", "HRK", json!({"previous": {"celsius": 1.0}})),
        )
        .unwrap_err();
        assert!(matches!(err, IntakeError::Payload { .. }));

        let err = ExternalFact::from_record(origin, record("PassengerBoarded", " ", json!({})))
            .unwrap_err();
        assert!(matches!(err, IntakeError::EmptySubject { .. }));
    }
}
