//! Aircraft readiness.
//!
//! An aircraft is registered by air traffic and becomes prepared when the
//! supplies service reports its pre-flight check complete. The check covers
//! fuel, de-icing and inspection at once; there is no partial readiness.

use serde::Serialize;
use tarmac_core::{smallvec, Emitted, EventEnvelope, Machine, Reaction, Route};

use crate::commands::RegisterAircraft;
use crate::facts::AirportEvent;
use crate::ids::AircraftId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AircraftStatus {
    Registered,
    Prepared,
}

/// Readiness flags only ever go from `false` to `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aircraft {
    checked: bool,
    fueled: bool,
    defrosted: bool,
}

impl Aircraft {
    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn fueled(&self) -> bool {
        self.fueled
    }

    pub fn defrosted(&self) -> bool {
        self.defrosted
    }

    pub fn status(&self) -> AircraftStatus {
        if self.checked && self.fueled && self.defrosted {
            AircraftStatus::Prepared
        } else {
            AircraftStatus::Registered
        }
    }
}

impl Machine for Aircraft {
    type Id = AircraftId;
    type Event = AirportEvent;
    type Command = RegisterAircraft;
    type Rejection = std::convert::Infallible;
    type Context = ();

    const NAME: &'static str = "Aircraft";

    fn route(event: &AirportEvent) -> Route<AircraftId> {
        match event {
            AirportEvent::AircraftPreflightCheckComplete { aircraft } => {
                Route::Existing(aircraft.clone())
            }
            _ => Route::Ignore,
        }
    }

    fn command_route(command: &RegisterAircraft) -> Route<AircraftId> {
        Route::Create(command.aircraft().clone())
    }

    fn decide(
        &self,
        id: &AircraftId,
        _: &EventEnvelope<AirportEvent>,
        _: &(),
    ) -> Reaction<AirportEvent> {
        match self.status() {
            AircraftStatus::Prepared => Reaction::ignore(),
            AircraftStatus::Registered => Reaction::emit(AirportEvent::AircraftPrepared {
                aircraft: id.clone(),
            }),
        }
    }

    fn handle(
        &self,
        id: &AircraftId,
        _: &RegisterAircraft,
        _: &(),
    ) -> Result<Emitted<AirportEvent>, Self::Rejection> {
        Ok(smallvec![AirportEvent::AircraftRegistered {
            aircraft: id.clone(),
        }])
    }

    fn apply(&mut self, event: &AirportEvent) {
        if let AirportEvent::AircraftPrepared { .. } = event {
            self.checked = true;
            self.fueled = true;
            self.defrosted = true;
        }
    }
}
