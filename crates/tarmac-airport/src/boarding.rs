//! Per-flight boarding tally.

use std::collections::BTreeSet;

use serde::Serialize;
use tarmac_core::{smallvec, Emitted, EventEnvelope, Machine, Reaction, Route};
use tracing::warn;

use crate::commands::ExpectPassengers;
use crate::facts::AirportEvent;
use crate::ids::{FlightId, PassengerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoardingStatus {
    /// No expected headcount yet; boarding cannot complete.
    UnknownCapacity,
    InProgress,
    Complete,
}

/// Boarded and denied passengers of one flight.
///
/// A passenger is in at most one of the two sets. Completion happens once,
/// the first time the tally equals the expected headcount; later passenger
/// facts are still recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Boarding {
    boarded: BTreeSet<PassengerId>,
    denied: BTreeSet<PassengerId>,
    expected: Option<usize>,
    completed: bool,
}

impl Boarding {
    pub fn boarded(&self) -> &BTreeSet<PassengerId> {
        &self.boarded
    }

    pub fn denied(&self) -> &BTreeSet<PassengerId> {
        &self.denied
    }

    pub fn expected(&self) -> Option<usize> {
        self.expected
    }

    /// Passengers accounted for, boarded or denied.
    pub fn tally(&self) -> usize {
        self.boarded.len() + self.denied.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn status(&self) -> BoardingStatus {
        match (self.completed, self.expected) {
            (true, _) => BoardingStatus::Complete,
            (false, None) => BoardingStatus::UnknownCapacity,
            (false, Some(_)) => BoardingStatus::InProgress,
        }
    }

    fn knows(&self, passenger: &PassengerId) -> bool {
        self.boarded.contains(passenger) || self.denied.contains(passenger)
    }

    fn completes_at(&self, tally: usize) -> bool {
        !self.completed && self.expected == Some(tally)
    }

    fn record_passenger(
        &self,
        flight: &FlightId,
        passenger: &PassengerId,
        same: &BTreeSet<PassengerId>,
        kind: &'static str,
    ) -> Reaction<AirportEvent> {
        if same.contains(passenger) {
            return Reaction::ignore();
        }
        if self.knows(passenger) {
            warn!(
                flight = %flight,
                passenger = %passenger,
                kind,
                "passenger already has the opposite outcome, fact ignored"
            );
            return Reaction::ignore();
        }

        let tally = self.tally() + 1;
        let reaction = Reaction::accept();
        if self.completes_at(tally) {
            reaction.and_emit(AirportEvent::BoardingComplete {
                flight: flight.clone(),
                headcount: tally,
            })
        } else {
            reaction
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardingRejection {
    #[error("boarding already complete with {headcount} passengers")]
    AlreadyComplete { headcount: usize },

    #[error("{tally} passengers already accounted for, cannot expect {count}")]
    TallyExceedsCount { tally: usize, count: usize },
}

impl Machine for Boarding {
    type Id = FlightId;
    type Event = AirportEvent;
    type Command = ExpectPassengers;
    type Rejection = BoardingRejection;
    type Context = ();

    const NAME: &'static str = "Boarding";

    fn route(event: &AirportEvent) -> Route<FlightId> {
        match event {
            AirportEvent::PassengerBoarded { flight, .. }
            | AirportEvent::PassengerDeniedBoarding { flight, .. } => Route::Upsert(flight.clone()),
            _ => Route::Ignore,
        }
    }

    fn command_route(command: &ExpectPassengers) -> Route<FlightId> {
        Route::Upsert(command.flight().clone())
    }

    fn decide(
        &self,
        id: &FlightId,
        envelope: &EventEnvelope<AirportEvent>,
        _: &(),
    ) -> Reaction<AirportEvent> {
        match &envelope.event {
            AirportEvent::PassengerBoarded { passenger, .. } => {
                self.record_passenger(id, passenger, &self.boarded, envelope.kind())
            }
            AirportEvent::PassengerDeniedBoarding { passenger, .. } => {
                self.record_passenger(id, passenger, &self.denied, envelope.kind())
            }
            _ => Reaction::ignore(),
        }
    }

    fn handle(
        &self,
        id: &FlightId,
        command: &ExpectPassengers,
        _: &(),
    ) -> Result<Emitted<AirportEvent>, BoardingRejection> {
        let count = command.count();
        let tally = self.tally();
        if self.completed {
            return Err(BoardingRejection::AlreadyComplete { headcount: tally });
        }
        if tally > count {
            return Err(BoardingRejection::TallyExceedsCount { tally, count });
        }

        let mut facts: Emitted<AirportEvent> = smallvec![AirportEvent::PassengersExpected {
            flight: id.clone(),
            count,
        }];
        if tally == count {
            facts.push(AirportEvent::BoardingComplete {
                flight: id.clone(),
                headcount: tally,
            });
        }
        Ok(facts)
    }

    fn apply(&mut self, event: &AirportEvent) {
        match event {
            AirportEvent::PassengersExpected { count, .. } => self.expected = Some(*count),
            AirportEvent::PassengerBoarded { passenger, .. } => {
                self.boarded.insert(passenger.clone());
            }
            AirportEvent::PassengerDeniedBoarding { passenger, .. } => {
                self.denied.insert(passenger.clone());
            }
            AirportEvent::BoardingComplete { .. } => self.completed = true,
            _ => {}
        }
    }
}
