//! Weather station translator.
//!
//! The station reports absolute measurements. The airport reacts to changes,
//! so each measurement is paired with the one before it. The very first
//! measurement has nothing to compare against and only primes the station.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarmac_core::Origin;

use super::{ExternalEvent, ExternalFact};
use crate::facts::{TemperatureSample, WindSample};
use crate::ids::AirportCode;

pub const WEATHER_ORIGIN: &str = "Weather";

/// One reading as published by the weather service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherMeasurement {
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub temperature: f64,
}

impl WeatherMeasurement {
    pub fn wind(&self) -> WindSample {
        WindSample {
            speed: self.wind_speed,
            azimuth: self.wind_direction,
        }
    }

    pub fn temperature(&self) -> TemperatureSample {
        TemperatureSample {
            celsius: self.temperature,
        }
    }
}

/// Remembers the last measurement of one station.
#[derive(Debug, Clone)]
pub struct WeatherStation {
    code: AirportCode,
    origin: Origin,
    previous: Option<WeatherMeasurement>,
}

impl WeatherStation {
    pub fn new(code: AirportCode) -> Self {
        Self {
            code,
            origin: Origin::new(WEATHER_ORIGIN),
            previous: None,
        }
    }

    pub fn code(&self) -> &AirportCode {
        &self.code
    }

    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }

    /// Record a measurement and return the change facts it produces.
    ///
    /// Temperature comes before wind.
    pub fn observe(
        &mut self,
        measurement: WeatherMeasurement,
        at: DateTime<Utc>,
    ) -> Vec<ExternalFact> {
        let Some(previous) = self.previous.replace(measurement) else {
            return Vec::new();
        };

        vec![
            ExternalFact::new(
                self.origin.clone(),
                at,
                ExternalEvent::TemperatureSampleChanged {
                    station: self.code.clone(),
                    previous: previous.temperature(),
                    new: measurement.temperature(),
                },
            ),
            ExternalFact::new(
                self.origin.clone(),
                at,
                ExternalEvent::WindSampleChanged {
                    station: self.code.clone(),
                    previous: previous.wind(),
                    new: measurement.wind(),
                },
            ),
        ]
    }
}
