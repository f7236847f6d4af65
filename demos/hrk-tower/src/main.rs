//! # HRK Tower Demo
//!
//! Runs one airport with simulated weather and security feeds and a tower
//! that infers departures and arrivals. Stop with ctrl-c.
//!
//! ```text
//! RUST_LOG=debug TARMAC_TOWER_INTERVAL_SECS=5 cargo run -p hrk-tower-demo
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tarmac_airport::intake::security::{self, SecurityRecord, SecurityStatus};
use tarmac_airport::intake::supplies::{self, SuppliesEvent, SuppliesEventType};
use tarmac_airport::intake::weather::{WeatherMeasurement, WeatherStation};
use tarmac_airport::{
    run_source, Airport, AirportCode, AirportConfig, ExpectPassengers, ExternalFact, FactSource,
    FlightId, RegisterAircraft, ScheduleFlight, SourceError, Tower,
};
use tarmac_core::Origin;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PASSENGERS_PER_FLIGHT: usize = 6;

// ============================================================================
// Simulated sources
// ============================================================================

/// Random-walk weather with the occasional gust.
struct SimulatedWeather {
    station: WeatherStation,
    rng: fastrand::Rng,
    current: WeatherMeasurement,
}

impl SimulatedWeather {
    fn new(code: AirportCode, seed: u64) -> Self {
        Self {
            station: WeatherStation::new(code),
            rng: fastrand::Rng::with_seed(seed),
            current: WeatherMeasurement {
                wind_speed: 20.0,
                wind_direction: 180.0,
                temperature: 15.0,
            },
        }
    }

    fn drift(&mut self) -> WeatherMeasurement {
        let gust = self.rng.u8(..) < 16;
        let next = &mut self.current;
        next.wind_speed = if gust {
            160.0 + self.rng.f64() * 20.0
        } else {
            (next.wind_speed + self.rng.f64() * 10.0 - 5.0).clamp(0.0, 140.0)
        };
        next.wind_direction = (next.wind_direction + self.rng.f64() * 50.0 - 25.0).rem_euclid(360.0);
        next.temperature += self.rng.f64() * 4.0 - 2.0;
        *next
    }
}

#[async_trait]
impl FactSource for SimulatedWeather {
    fn name(&self) -> &str {
        "weather"
    }

    async fn poll(&mut self) -> Result<Vec<ExternalFact>, SourceError> {
        let measurement = self.drift();
        Ok(self.station.observe(measurement, Utc::now()))
    }
}

/// Passengers trickling through the security checkpoint.
struct SimulatedSecurity {
    flights: Vec<FlightId>,
    next_passenger: usize,
    rng: fastrand::Rng,
}

#[async_trait]
impl FactSource for SimulatedSecurity {
    fn name(&self) -> &str {
        "security"
    }

    async fn poll(&mut self) -> Result<Vec<ExternalFact>, SourceError> {
        if self.rng.u8(..) < 8 {
            return Err(SourceError::Unavailable("checkpoint feed timed out".into()));
        }

        let mut facts = Vec::new();
        for _ in 0..self.rng.usize(0..3) {
            let Some(flight) = self.rng.choice(&self.flights).cloned() else {
                break;
            };
            self.next_passenger += 1;
            let status = match self.rng.u8(0..10) {
                0 => SecurityStatus::Detained,
                1 => SecurityStatus::Denied,
                2 => SecurityStatus::NotAttempted,
                _ => SecurityStatus::Passed,
            };
            let record = SecurityRecord {
                id: format!("pax-{}", self.next_passenger).into(),
                flight_number: flight,
                status,
            };
            facts.extend(security::translate(&record, Utc::now()));
        }
        Ok(facts)
    }
}

// ============================================================================
// Setup
// ============================================================================

fn seed_schedule(airport: &Airport) -> Result<Vec<FlightId>> {
    let air_traffic = Origin::new("Air Traffic");
    let now = Utc::now();

    airport.register_aircraft(RegisterAircraft::new("UR-PSA".into())?, &air_traffic, now)?;

    let mut flights = Vec::new();
    for (n, destination) in ["KBP", "LWO", "ODS"].into_iter().enumerate() {
        let flight = FlightId::new(format!("PS-10{}", n + 1));
        let departure = (now + Duration::minutes(30 * (n as i64 + 1))).fixed_offset();
        airport.schedule_flight(
            ScheduleFlight::new(
                flight.clone(),
                "UR-PSA".into(),
                airport.code().clone(),
                destination.into(),
                departure,
                departure + Duration::minutes(75),
            )?,
            &air_traffic,
            now,
        )?;
        airport.expect_passengers(
            ExpectPassengers::new(flight.clone(), PASSENGERS_PER_FLIGHT)?,
            &Origin::new("Check-in"),
            now,
        )?;
        flights.push(flight);
    }

    let preflight = SuppliesEvent {
        event_type: SuppliesEventType::PreflightCheckComplete,
        aircraft: "UR-PSA".into(),
        when_occurred: now,
    };
    if let Some(fact) = supplies::translate(&preflight) {
        airport.receive(fact)?;
    }

    Ok(flights)
}

async fn log_facts(airport: Arc<Airport>, shutdown: CancellationToken) {
    let mut facts = airport.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = facts.recv() => match received {
                Ok(fact) => info!(
                    kind = fact.kind(),
                    subject = %fact.event.subject(),
                    origin = %fact.origin,
                    "fact"
                ),
                Err(RecvError::Lagged(missed)) => warn!(missed, "fact log lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = AirportConfig::from_env()?;
    let airport = Arc::new(Airport::new(&config));
    let flights = seed_schedule(&airport)?;
    info!(airport = %config.code, flights = flights.len(), "schedule loaded");

    let shutdown = CancellationToken::new();
    let poll = config.intake.poll_interval();

    let weather = SimulatedWeather::new(config.code.clone(), 42);
    let checkpoint = SimulatedSecurity {
        flights,
        next_passenger: 0,
        rng: fastrand::Rng::with_seed(7),
    };
    let tower = Tower::new(airport.clone(), &config.code)
        .with_interval(config.tower.interval())
        .with_shutdown(shutdown.child_token());

    let tasks = vec![
        tokio::spawn(log_facts(airport.clone(), shutdown.clone())),
        tokio::spawn(tower.run()),
    ];
    let sources = vec![
        tokio::spawn(run_source(weather, airport.clone(), poll, shutdown.clone())),
        tokio::spawn(run_source(checkpoint, airport.clone(), poll, shutdown.clone())),
    ];

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    shutdown.cancel();

    for result in futures::future::join_all(tasks).await {
        result?;
    }
    for result in futures::future::join_all(sources).await {
        let stats = result?;
        info!(?stats, "source finished");
    }

    for (id, flight) in airport.flights() {
        info!(flight = %id, status = ?flight.status(), "final state");
    }
    Ok(())
}
