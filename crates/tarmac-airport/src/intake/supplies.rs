//! Airplane supplies translator.
//!
//! Supplies reports fueling and de-icing separately, but an aircraft is only
//! ready once the pre-flight check confirms everything together. The partial
//! reports are acknowledged and dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarmac_core::Origin;
use tracing::debug;

use super::{ExternalEvent, ExternalFact};
use crate::ids::AircraftId;

pub const SUPPLIES_ORIGIN: &str = "Airplane Supplies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppliesEventType {
    PlaneFueled,
    AntiFrostingCheckComplete,
    PreflightCheckComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppliesEvent {
    pub event_type: SuppliesEventType,
    pub aircraft: AircraftId,
    pub when_occurred: DateTime<Utc>,
}

pub fn translate(event: &SuppliesEvent) -> Option<ExternalFact> {
    match event.event_type {
        SuppliesEventType::PreflightCheckComplete => Some(ExternalFact::new(
            Origin::new(SUPPLIES_ORIGIN),
            event.when_occurred,
            ExternalEvent::AircraftPreflightCheckComplete {
                aircraft: event.aircraft.clone(),
            },
        )),
        partial => {
            debug!(aircraft = %event.aircraft, event_type = ?partial, "partial supplies report dropped");
            None
        }
    }
}
