//! Airport security translator.
//!
//! Security publishes one record per passenger check. Only a final outcome
//! becomes a boarding fact; passengers who have not attempted the check yet
//! produce nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarmac_core::Origin;

use super::{ExternalEvent, ExternalFact};
use crate::ids::{FlightId, PassengerId};

pub const SECURITY_ORIGIN: &str = "Airport Security";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityStatus {
    NotAttempted,
    Passed,
    Denied,
    Detained,
}

/// A passenger's security check as reported by the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRecord {
    pub id: PassengerId,
    pub flight_number: FlightId,
    pub status: SecurityStatus,
}

/// Turn a check record into a boarding fact, if the outcome is final.
pub fn translate(record: &SecurityRecord, at: DateTime<Utc>) -> Option<ExternalFact> {
    let flight = record.flight_number.clone();
    let passenger = record.id.clone();
    let event = match record.status {
        SecurityStatus::NotAttempted => return None,
        SecurityStatus::Passed => ExternalEvent::PassengerBoarded { flight, passenger },
        SecurityStatus::Denied | SecurityStatus::Detained => {
            ExternalEvent::PassengerDeniedBoarding { flight, passenger }
        }
    };
    Some(ExternalFact::new(Origin::new(SECURITY_ORIGIN), at, event))
}
