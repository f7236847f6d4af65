//! The airport: every machine of one airport behind a single engine.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tarmac_core::{
    CommandError, Engine, EventBus, EventEnvelope, Origin, ReactError, Repository,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::aircraft::Aircraft;
use crate::boarding::{Boarding, BoardingRejection};
use crate::commands::{ExpectPassengers, RegisterAircraft, RescheduleFlight, ScheduleFlight};
use crate::config::AirportConfig;
use crate::facts::AirportEvent;
use crate::flight::{Flight, FlightCommand, FlightRejection};
use crate::ids::{AircraftId, AirportCode, FlightId};
use crate::intake::{ExternalFact, FactRecord, IntakeError};
use crate::tower::{Airspace, SnapshotError};

/// Settled facts, in the order they were applied.
pub type Facts = Vec<EventEnvelope<AirportEvent>>;

#[derive(Debug, thiserror::Error)]
pub enum AirportError {
    #[error(transparent)]
    Flight(#[from] CommandError<FlightRejection>),

    #[error(transparent)]
    Aircraft(#[from] CommandError<Infallible>),

    #[error(transparent)]
    Boarding(#[from] CommandError<BoardingRejection>),

    #[error(transparent)]
    Rejected(#[from] ReactError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

/// Command, intake and query surface of one airport.
///
/// Commands are validated by their machine and return an error to the
/// caller. Facts from external systems and from the tower go through the
/// engine; everything they cause is settled before the call returns.
pub struct Airport {
    code: AirportCode,
    aircraft: Arc<Repository<Aircraft>>,
    flights: Arc<Repository<Flight>>,
    boardings: Arc<Repository<Boarding>>,
    engine: Engine<AirportEvent>,
}

impl Airport {
    pub fn new(config: &AirportConfig) -> Self {
        let aircraft = Arc::new(Repository::<Aircraft>::new());
        let flights = Arc::new(Repository::<Flight>::with_context(config.reschedule.clone()));
        let boardings = Arc::new(Repository::<Boarding>::new());

        let engine = Engine::builder()
            .with_reactor(aircraft.clone())
            .with_reactor(flights.clone())
            .with_reactor(boardings.clone())
            .with_bus_capacity(config.bus_capacity)
            .build();

        info!(airport = %config.code, "airport ready");

        Self {
            code: config.code.clone(),
            aircraft,
            flights,
            boardings,
            engine,
        }
    }

    pub fn code(&self) -> &AirportCode {
        &self.code
    }

    pub fn register_aircraft(
        &self,
        command: RegisterAircraft,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Facts, AirportError> {
        let facts = self.aircraft.execute(&command, origin, at)?;
        Ok(self.engine.propagate(facts))
    }

    pub fn schedule_flight(
        &self,
        command: ScheduleFlight,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Facts, AirportError> {
        self.flight_command(FlightCommand::Schedule(command), origin, at)
    }

    pub fn reschedule_flight(
        &self,
        command: RescheduleFlight,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Facts, AirportError> {
        self.flight_command(FlightCommand::Reschedule(command), origin, at)
    }

    fn flight_command(
        &self,
        command: FlightCommand,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Facts, AirportError> {
        let facts = self.flights.execute(&command, origin, at)?;
        Ok(self.engine.propagate(facts))
    }

    pub fn expect_passengers(
        &self,
        command: ExpectPassengers,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Facts, AirportError> {
        let facts = self.boardings.execute(&command, origin, at)?;
        Ok(self.engine.propagate(facts))
    }

    /// Apply a fact reported by an external system.
    ///
    /// Returns the facts it caused. A fact about an unknown aircraft or
    /// flight is rejected and logged; it is not applied anywhere. Delivering
    /// the same fact again causes nothing.
    pub fn receive(&self, fact: ExternalFact) -> Result<Facts, AirportError> {
        debug!(
            kind = fact.kind(),
            origin = %fact.origin,
            occurred_at = %fact.occurred_at,
            "external fact received"
        );
        Ok(self.engine.dispatch(fact.into_envelope())?)
    }

    /// Check a wire record, then apply it as [`receive`](Self::receive) does.
    pub fn receive_record(&self, origin: Origin, record: FactRecord) -> Result<Facts, AirportError> {
        let fact = ExternalFact::from_record(origin, record)?;
        self.receive(fact)
    }

    /// Apply a lifecycle fact inferred inside the airport, such as a tower
    /// observation.
    pub fn import(
        &self,
        origin: &Origin,
        at: DateTime<Utc>,
        event: AirportEvent,
    ) -> Result<Facts, AirportError> {
        Ok(self
            .engine
            .dispatch(EventEnvelope::new(origin.clone(), at, event))?)
    }

    pub fn flight(&self, id: &FlightId) -> Option<Flight> {
        self.flights.get(id)
    }

    pub fn aircraft(&self, id: &AircraftId) -> Option<Aircraft> {
        self.aircraft.get(id)
    }

    pub fn boarding(&self, flight: &FlightId) -> Option<Boarding> {
        self.boardings.get(flight)
    }

    /// Every flight, ordered by id.
    pub fn flights(&self) -> Vec<(FlightId, Flight)> {
        self.flights.snapshot()
    }

    pub fn flight_history(&self, id: &FlightId) -> Option<Facts> {
        self.flights.history(id)
    }

    pub fn aircraft_history(&self, id: &AircraftId) -> Option<Facts> {
        self.aircraft.history(id)
    }

    pub fn boarding_history(&self, flight: &FlightId) -> Option<Facts> {
        self.boardings.history(flight)
    }

    pub fn bus(&self) -> &EventBus<AirportEvent> {
        self.engine.bus()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventEnvelope<AirportEvent>>> {
        self.engine.bus().subscribe()
    }
}

impl Airspace for Airport {
    fn flights(&self) -> Result<Vec<(FlightId, Flight)>, SnapshotError> {
        Ok(Airport::flights(self))
    }

    fn import(
        &self,
        origin: &Origin,
        at: DateTime<Utc>,
        event: AirportEvent,
    ) -> Result<Facts, AirportError> {
        Airport::import(self, origin, at, event)
    }
}
