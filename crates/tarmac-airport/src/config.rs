//! Airport configuration.
//!
//! Every setting has a default; environment variables override them:
//!
//! - `TARMAC_AIRPORT_CODE` -- airport served by this process (default `HRK`)
//! - `TARMAC_BUS_CAPACITY` -- facts buffered per bus subscriber (default 1024)
//! - `TARMAC_TOWER_INTERVAL_SECS` -- seconds between tower ticks (default 60)
//! - `TARMAC_POLL_INTERVAL_SECS` -- seconds between source polls (default 5)
//!
//! Configs read from a document are checked by [`AirportConfig::validate`]
//! as they are deserialized.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tarmac_core::DEFAULT_BUS_CAPACITY;

use crate::flight::{ReschedulePolicy, MAX_DELAY_MINUTES};
use crate::ids::AirportCode;

/// Errors that can occur when loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },

    #[error("{var} must not be blank")]
    Blank { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ConfigDocument")]
pub struct AirportConfig {
    pub code: AirportCode,
    pub bus_capacity: usize,
    pub tower: TowerConfig,
    pub intake: IntakeConfig,
    pub reschedule: ReschedulePolicy,
}

/// Unchecked shape of a config document.
#[derive(Deserialize)]
#[serde(default)]
struct ConfigDocument {
    code: AirportCode,
    bus_capacity: usize,
    tower: TowerConfig,
    intake: IntakeConfig,
    reschedule: ReschedulePolicy,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        let AirportConfig {
            code,
            bus_capacity,
            tower,
            intake,
            reschedule,
        } = AirportConfig::default();
        Self {
            code,
            bus_capacity,
            tower,
            intake,
            reschedule,
        }
    }
}

impl TryFrom<ConfigDocument> for AirportConfig {
    type Error = ConfigError;

    fn try_from(doc: ConfigDocument) -> Result<Self, Self::Error> {
        let config = Self {
            code: doc.code,
            bus_capacity: doc.bus_capacity,
            tower: doc.tower,
            intake: doc.intake,
            reschedule: doc.reschedule,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for AirportConfig {
    fn default() -> Self {
        Self {
            code: AirportCode::new("HRK"),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            tower: TowerConfig::default(),
            intake: IntakeConfig::default(),
            reschedule: ReschedulePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    pub interval_secs: u64,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl TowerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub poll_interval_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl IntakeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl AirportConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from any variable lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(code) = lookup("TARMAC_AIRPORT_CODE") {
            if code.trim().is_empty() {
                return Err(ConfigError::Blank {
                    var: "TARMAC_AIRPORT_CODE",
                });
            }
            config.code = AirportCode::new(code.trim());
        }
        if let Some(capacity) = parse_positive(&lookup, "TARMAC_BUS_CAPACITY")? {
            config.bus_capacity = capacity;
        }
        if let Some(secs) = parse_positive(&lookup, "TARMAC_TOWER_INTERVAL_SECS")? {
            config.tower.interval_secs = secs;
        }
        if let Some(secs) = parse_positive(&lookup, "TARMAC_POLL_INTERVAL_SECS")? {
            config.intake.poll_interval_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would stall or crash the airport at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code.as_str().trim().is_empty() {
            return Err(ConfigError::Blank { var: "code" });
        }
        for (var, value) in [
            ("bus_capacity", self.bus_capacity as u64),
            ("tower.interval_secs", self.tower.interval_secs),
            ("intake.poll_interval_secs", self.intake.poll_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { var });
            }
        }

        let policy = &self.reschedule;
        for (var, threshold) in [
            ("reschedule.wind_direction_threshold", policy.wind_direction_threshold),
            ("reschedule.wind_speed_threshold", policy.wind_speed_threshold),
            ("reschedule.temperature_threshold", policy.temperature_threshold),
        ] {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ConfigError::Invalid {
                    var,
                    value: threshold.to_string(),
                    reason: "must be a finite, non-negative number".into(),
                });
            }
        }
        for (var, minutes) in [
            ("reschedule.wind_direction_delay_minutes", policy.wind_direction_delay_minutes),
            ("reschedule.wind_speed_delay_minutes", policy.wind_speed_delay_minutes),
            ("reschedule.temperature_delay_minutes", policy.temperature_delay_minutes),
        ] {
            if !(0..=MAX_DELAY_MINUTES).contains(&minutes) {
                return Err(ConfigError::Invalid {
                    var,
                    value: minutes.to_string(),
                    reason: format!("must be between 0 and {MAX_DELAY_MINUTES}"),
                });
            }
        }
        Ok(())
    }
}

/// Parse an optional variable that must be a positive number.
fn parse_positive<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    let parsed: T = value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.clone(),
        reason: e.to_string(),
    })?;
    if parsed == T::default() {
        return Err(ConfigError::Zero { var });
    }
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AirportConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AirportConfig::default());
        assert_eq!(config.code, AirportCode::new("HRK"));
        assert_eq!(config.tower.interval(), Duration::from_secs(60));
        assert_eq!(config.intake.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.bus_capacity, 1024);
        assert_eq!(config.reschedule.wind_speed_threshold, 150.0);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AirportConfig::from_lookup(lookup(&[
            ("TARMAC_AIRPORT_CODE", " KBP "),
            ("TARMAC_BUS_CAPACITY", "64"),
            ("TARMAC_TOWER_INTERVAL_SECS", "2"),
            ("TARMAC_POLL_INTERVAL_SECS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.code, AirportCode::new("KBP"));
        assert_eq!(config.bus_capacity, 64);
        assert_eq!(config.tower.interval(), Duration::from_secs(2));
        assert_eq!(config.intake.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = AirportConfig::from_lookup(lookup(&[("TARMAC_BUS_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "TARMAC_BUS_CAPACITY",
                ..
            }
        ));

        let err = AirportConfig::from_lookup(lookup(&[("TARMAC_TOWER_INTERVAL_SECS", "0")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Zero {
                var: "TARMAC_TOWER_INTERVAL_SECS"
            }
        );

        let err = AirportConfig::from_lookup(lookup(&[("TARMAC_AIRPORT_CODE", "  ")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Blank {
                var: "TARMAC_AIRPORT_CODE"
            }
        );
    }

    #[test]
    fn test_deserializes_partial_documents() {
        let config: AirportConfig = serde_json::from_str(
            r#"{"code": "LWO", "tower": {"interval_secs": 30}, "reschedule": {"wind_speed_threshold": 120.0}}"#,
        )
        .unwrap();

        assert_eq!(config.code, AirportCode::new("LWO"));
        assert_eq!(config.tower.interval_secs, 30);
        assert_eq!(config.intake.poll_interval_secs, 5);
        assert_eq!(config.reschedule.wind_speed_threshold, 120.0);
        assert_eq!(config.reschedule.wind_direction_threshold, 30.0);
    }

    #[test]
    fn test_documents_are_validated() {
        let err = serde_json::from_str::<AirportConfig>(r#"{"tower": {"interval_secs": 0}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("tower.interval_secs"));

        let err = serde_json::from_str::<AirportConfig>(r#"{"intake": {"poll_interval_secs": 0}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("intake.poll_interval_secs"));

        let err = serde_json::from_str::<AirportConfig>(
            r#"{"reschedule": {"wind_speed_delay_minutes": 9223372036854775807}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("reschedule.wind_speed_delay_minutes"));

        let err = serde_json::from_str::<AirportConfig>(r#"{"code": " "}"#).unwrap_err();
        assert!(err.to_string().contains("code"));
    }

    #[test]
    fn test_validate_rejects_hand_built_values() {
        let mut config = AirportConfig::default();
        assert_eq!(config.validate(), Ok(()));

        config.reschedule.temperature_delay_minutes = -5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                var: "reschedule.temperature_delay_minutes",
                ..
            })
        ));

        let mut config = AirportConfig::default();
        config.reschedule.wind_direction_threshold = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                var: "reschedule.wind_direction_threshold",
                ..
            })
        ));

        let mut config = AirportConfig::default();
        config.bus_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::Zero { var: "bus_capacity" }));
    }
}
