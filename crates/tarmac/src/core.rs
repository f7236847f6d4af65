//! Core fact types: the [`Event`] trait, [`Origin`], and [`EventEnvelope`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fact: an immutable record of something that happened.
///
/// Facts are plain data. Every fact type names its kind so that logs and
/// rejections can say what was being applied without formatting the payload.
pub trait Event: Clone + fmt::Debug + Send + Sync + 'static {
    /// Stable name of this fact's kind, e.g. `"FlightDeparted"`.
    fn kind(&self) -> &'static str;
}

/// The system a fact came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A fact plus the metadata needed to replay and diagnose it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    /// Unique id of this fact. Redeliveries of one fact share it.
    pub id: Uuid,
    /// Who produced the fact.
    pub origin: Origin,
    /// When the fact happened, as reported by its producer.
    pub occurred_at: DateTime<Utc>,
    /// The fact this one was derived from, if any.
    pub caused_by: Option<Uuid>,
    pub event: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a fact observed by `origin` at `occurred_at`.
    pub fn new(origin: Origin, occurred_at: DateTime<Utc>, event: E) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            occurred_at,
            caused_by: None,
            event,
        }
    }

    /// Replace the random id with one the producer derived.
    ///
    /// Machines skip a fact whose id they have already handled, so a source
    /// that may deliver the same fact twice should give it a stable id.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Wrap a fact emitted by a machine in reaction to this one.
    ///
    /// Derived facts share the occurrence time of their cause, so replaying a
    /// history yields the same timestamps.
    pub fn derive(&self, origin: Origin, event: E) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            occurred_at: self.occurred_at,
            caused_by: Some(self.id),
            event,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.event.kind()
    }
}
