//! A small counter domain used by the unit tests of this crate.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::{Event, EventEnvelope};
use crate::machine::{Emitted, Machine, Reaction, Route};

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap() + Duration::minutes(minutes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fact {
    Opened { id: String },
    Bumped { id: String },
    BumpAll,
    Full { id: String, total: usize },
    Noted { id: String },
}

impl Event for Fact {
    fn kind(&self) -> &'static str {
        match self {
            Fact::Opened { .. } => "Opened",
            Fact::Bumped { .. } => "Bumped",
            Fact::BumpAll => "BumpAll",
            Fact::Full { .. } => "Full",
            Fact::Noted { .. } => "Noted",
        }
    }
}

#[derive(Debug, Clone)]
pub enum CounterCommand {
    Open(String),
    Reset(String),
}

#[derive(Debug, thiserror::Error)]
#[error("counter is full")]
pub struct CounterFull;

/// Counts bumps and emits `Full` exactly once when the cap is reached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counter {
    pub count: usize,
    pub full: bool,
}

impl Machine for Counter {
    type Id = String;
    type Event = Fact;
    type Command = CounterCommand;
    type Rejection = CounterFull;
    type Context = usize;

    const NAME: &'static str = "Counter";

    fn route(event: &Fact) -> Route<String> {
        match event {
            Fact::Bumped { id } => Route::Existing(id.clone()),
            Fact::BumpAll => Route::Broadcast,
            _ => Route::Ignore,
        }
    }

    fn command_route(command: &CounterCommand) -> Route<String> {
        match command {
            CounterCommand::Open(id) => Route::Create(id.clone()),
            CounterCommand::Reset(id) => Route::Existing(id.clone()),
        }
    }

    fn decide(&self, id: &String, _: &EventEnvelope<Fact>, cap: &usize) -> Reaction<Fact> {
        let total = self.count + 1;
        if !self.full && total == *cap {
            Reaction::accept().and_emit(Fact::Full {
                id: id.clone(),
                total,
            })
        } else {
            Reaction::accept()
        }
    }

    fn handle(
        &self,
        id: &String,
        command: &CounterCommand,
        _: &usize,
    ) -> Result<Emitted<Fact>, CounterFull> {
        match command {
            CounterCommand::Open(_) => Ok(smallvec::smallvec![Fact::Opened { id: id.clone() }]),
            CounterCommand::Reset(_) if self.full => Err(CounterFull),
            CounterCommand::Reset(_) => Ok(Emitted::new()),
        }
    }

    fn apply(&mut self, event: &Fact) {
        match event {
            Fact::Bumped { .. } | Fact::BumpAll => self.count += 1,
            Fact::Full { .. } => self.full = true,
            Fact::Opened { .. } | Fact::Noted { .. } => {}
        }
    }
}

/// Notes every `Full` fact, creating its record on first use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notebook {
    pub notes: usize,
}

impl Machine for Notebook {
    type Id = String;
    type Event = Fact;
    type Command = String;
    type Rejection = std::convert::Infallible;
    type Context = ();

    const NAME: &'static str = "Notebook";

    fn route(event: &Fact) -> Route<String> {
        match event {
            Fact::Full { id, .. } => Route::Upsert(id.clone()),
            _ => Route::Ignore,
        }
    }

    fn command_route(_: &String) -> Route<String> {
        Route::Ignore
    }

    fn decide(&self, id: &String, _: &EventEnvelope<Fact>, _: &()) -> Reaction<Fact> {
        Reaction::emit(Fact::Noted { id: id.clone() })
    }

    fn handle(
        &self,
        _: &String,
        _: &String,
        _: &(),
    ) -> Result<Emitted<Fact>, std::convert::Infallible> {
        Ok(Emitted::new())
    }

    fn apply(&mut self, event: &Fact) {
        if let Fact::Noted { .. } = event {
            self.notes += 1;
        }
    }
}
