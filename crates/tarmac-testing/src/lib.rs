//! Testing utilities for tarmac machines.
//!
//! - [`FactRecorder`] drains an [`EventBus`] subscription without awaiting, so
//!   tests can assert on exactly what one dispatch published.
//! - [`clock`] builds timestamps on a fixed day from wall-clock style inputs.

use std::sync::Arc;

use tarmac_core::{Event, EventBus, EventEnvelope};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Collects every fact published on a bus after it was created.
pub struct FactRecorder<E: Event> {
    receiver: broadcast::Receiver<Arc<EventEnvelope<E>>>,
}

impl<E: Event> FactRecorder<E> {
    pub fn new(bus: &EventBus<E>) -> Self {
        Self {
            receiver: bus.subscribe(),
        }
    }

    /// Everything published since the last drain, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the recorder lagged and lost facts; a test that publishes
    /// more than the bus capacity between drains is wrong.
    pub fn drain(&mut self) -> Vec<EventEnvelope<E>> {
        let mut facts = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(fact) => facts.push((*fact).clone()),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return facts,
                Err(TryRecvError::Lagged(missed)) => {
                    panic!("fact recorder lagged and missed {missed} facts")
                }
            }
        }
    }

    /// Drain and keep only the facts themselves.
    pub fn events(&mut self) -> Vec<E> {
        self.drain().into_iter().map(|e| e.event).collect()
    }

    /// Drain and keep only the fact kinds.
    pub fn kinds(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(EventEnvelope::kind).collect()
    }
}

pub mod clock {
    //! Fixed-day timestamps: every helper works on 2020-06-01.

    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    /// `hh:mm` on the test day at the given UTC offset in hours.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range offset or time.
    pub fn local(hour: u32, minute: u32, offset_hours: i32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(offset_hours * 3600).expect("valid offset");
        offset
            .with_ymd_and_hms(2020, 6, 1, hour, minute, 0)
            .single()
            .expect("valid local time")
    }

    /// `hh:mm` on the test day, UTC, with an offset type.
    pub fn hm(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        local(hour, minute, 0)
    }

    /// `hh:mm` on the test day as an instant.
    pub fn instant(hour: u32, minute: u32) -> DateTime<Utc> {
        hm(hour, minute).with_timezone(&Utc)
    }
}
