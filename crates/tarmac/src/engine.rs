//! The engine: routes facts to every machine kind and cascades what they emit.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::warn;

use crate::bus::{EventBus, DEFAULT_BUS_CAPACITY};
use crate::core::{Event, EventEnvelope};
use crate::error::ReactError;

/// Upper bound on facts settled by one dispatch.
///
/// Machines never react to their own facts, so a cascade only runs this long
/// when two machine kinds feed each other without converging.
pub const MAX_CASCADE: usize = 4096;

/// A kind of machine the engine can route facts to.
///
/// Implemented by [`Repository`](crate::Repository) for every machine.
pub trait Reactor<E: Event>: Send + Sync {
    fn name(&self) -> &'static str;

    fn react(&self, envelope: &EventEnvelope<E>) -> Result<Vec<EventEnvelope<E>>, ReactError>;
}

/// Builder for [`Engine`].
pub struct EngineBuilder<E: Event> {
    reactors: Vec<Arc<dyn Reactor<E>>>,
    capacity: usize,
}

impl<E: Event> Default for EngineBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EngineBuilder<E> {
    pub fn new() -> Self {
        Self {
            reactors: Vec::new(),
            capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    pub fn with_reactor<R: Reactor<E> + 'static>(mut self, reactor: Arc<R>) -> Self {
        self.reactors.push(reactor);
        self
    }

    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> Engine<E> {
        Engine {
            reactors: self.reactors,
            bus: EventBus::with_capacity(self.capacity),
        }
    }
}

/// Applies facts to machines and feeds emitted facts back in until quiet.
///
/// The engine holds no lock of its own. Each repository serializes writes
/// per entity, so callers on different tasks may dispatch concurrently.
/// A caller that needs ordering for one subject dispatches its facts for
/// that subject sequentially.
pub struct Engine<E: Event> {
    reactors: Vec<Arc<dyn Reactor<E>>>,
    bus: EventBus<E>,
}

impl<E: Event> Engine<E> {
    pub fn builder() -> EngineBuilder<E> {
        EngineBuilder::new()
    }

    pub fn bus(&self) -> &EventBus<E> {
        &self.bus
    }

    /// Apply an incoming fact and everything it causes.
    ///
    /// Returns the derived facts in settlement order. If any machine kind
    /// rejects the incoming fact, the error is returned after the other
    /// machines' reactions have settled, and the fact itself is not published.
    pub fn dispatch(&self, envelope: EventEnvelope<E>) -> Result<Vec<EventEnvelope<E>>, ReactError> {
        let mut derived = VecDeque::new();
        let mut rejection = None;

        for reactor in &self.reactors {
            match reactor.react(&envelope) {
                Ok(facts) => derived.extend(facts),
                Err(err) => {
                    warn!(
                        reactor = reactor.name(),
                        kind = envelope.kind(),
                        origin = %envelope.origin,
                        occurred_at = %envelope.occurred_at,
                        fact = %envelope.id,
                        error = %err,
                        "fact rejected"
                    );
                    rejection.get_or_insert(err);
                }
            }
        }

        if rejection.is_none() {
            self.bus.publish(envelope);
        }
        let settled = self.cascade(derived);

        match rejection {
            Some(err) => Err(err),
            None => Ok(settled),
        }
    }

    /// Publish facts that were already applied by a command and cascade them.
    ///
    /// Returns the given facts followed by everything they caused.
    pub fn propagate(&self, facts: Vec<EventEnvelope<E>>) -> Vec<EventEnvelope<E>> {
        self.cascade(facts.into())
    }

    fn cascade(&self, mut queue: VecDeque<EventEnvelope<E>>) -> Vec<EventEnvelope<E>> {
        let mut settled = Vec::new();

        while let Some(fact) = queue.pop_front() {
            if settled.len() >= MAX_CASCADE {
                warn!(
                    dropped = queue.len() + 1,
                    kind = fact.kind(),
                    "cascade limit reached, remaining facts dropped"
                );
                break;
            }

            for reactor in &self.reactors {
                match reactor.react(&fact) {
                    Ok(more) => queue.extend(more),
                    Err(err) => warn!(
                        reactor = reactor.name(),
                        kind = fact.kind(),
                        origin = %fact.origin,
                        occurred_at = %fact.occurred_at,
                        fact = %fact.id,
                        error = %err,
                        "derived fact rejected"
                    ),
                }
            }

            self.bus.publish(fact.clone());
            settled.push(fact);
        }

        settled
    }
}
