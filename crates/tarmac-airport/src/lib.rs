//! # Tarmac Airport
//!
//! Takeoffs and landings for one airport, built on tarmac machines.
//!
//! ## Machines
//!
//! - [`Aircraft`]: registered by air traffic, prepared once supplies report
//!   the pre-flight check complete.
//! - [`Flight`]: scheduled by command, postponed by weather, marked boarded,
//!   departed and arrived.
//! - [`Boarding`]: per-flight tally of boarded and denied passengers that
//!   completes exactly once.
//!
//! ## Flow
//!
//! ```text
//! weather / security / supplies ──► intake ──► Airport::receive
//!                                                  │
//! callers ──► Airport::schedule_flight, ...        ▼
//!                                   Engine ─► Aircraft, Flight, Boarding
//!                                                  │
//!              BoardingComplete ─► Flight ─► FlightBoarded
//!                                                  │
//! Tower (every minute) ─► Airport::import ◄────────┘ snapshot
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tarmac_airport::{Airport, AirportConfig, ScheduleFlight, Tower};
//!
//! let config = AirportConfig::from_env()?;
//! let airport = Arc::new(Airport::new(&config));
//!
//! airport.schedule_flight(
//!     ScheduleFlight::new("PS-101".into(), "UR-PSA".into(), "HRK".into(), "KBP".into(), dep, arr)?,
//!     &Origin::new("Air Traffic"),
//!     Utc::now(),
//! )?;
//!
//! let tower = Tower::new(airport.clone(), &config.code).with_interval(config.tower.interval());
//! tokio::spawn(tower.run());
//! ```

mod aircraft;
mod airport;
mod boarding;
mod commands;
mod config;
mod facts;
mod flight;
mod ids;
pub mod intake;
mod tower;

pub use aircraft::{Aircraft, AircraftStatus};
pub use airport::{Airport, AirportError, Facts};
pub use boarding::{Boarding, BoardingRejection, BoardingStatus};
pub use commands::{
    ExpectPassengers, RegisterAircraft, RescheduleFlight, ScheduleFlight, ValidationError,
};
pub use config::{AirportConfig, ConfigError, IntakeConfig, TowerConfig};
pub use facts::{AirportEvent, RescheduleReason, TemperatureSample, WindSample};
pub use flight::{
    Flight, FlightCommand, FlightRejection, FlightStatus, Itinerary, ReschedulePolicy,
    MAX_DELAY_MINUTES,
};
pub use ids::{AircraftId, AirportCode, FlightId, PassengerId};
pub use intake::source::{run_source, FactSource, SourceError, SourceStats, MIN_POLL_INTERVAL};
pub use intake::{ExternalEvent, ExternalFact, FactRecord, IntakeError};
pub use tower::{
    select, Airspace, Selection, SnapshotError, TickReport, Tower, TowerError,
    DEFAULT_TOWER_INTERVAL, MIN_TOWER_INTERVAL,
};
