//! The [`Machine`] trait: one state machine per entity id.

use std::fmt;
use std::hash::Hash;

use smallvec::SmallVec;

use crate::core::{Event, EventEnvelope};

/// Facts emitted by a single decision. Most decisions emit zero or one.
pub type Emitted<E> = SmallVec<[E; 2]>;

/// Where a fact or command is addressed for one kind of machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<Id> {
    /// Not addressed to this kind of machine.
    Ignore,
    /// Creates a new entity; fails if the id is already taken.
    Create(Id),
    /// Addressed to an entity that must already exist.
    Existing(Id),
    /// Addressed to an entity that is created on first use.
    Upsert(Id),
    /// Addressed to every entity of this kind.
    Broadcast,
}

/// Outcome of [`Machine::decide`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction<E> {
    /// Whether the incoming fact itself is applied and appended to history.
    pub accept: bool,
    /// New facts, applied to this entity and then published.
    pub emit: Emitted<E>,
}

impl<E> Reaction<E> {
    /// The fact changes nothing for this entity.
    pub fn ignore() -> Self {
        Self {
            accept: false,
            emit: SmallVec::new(),
        }
    }

    /// Apply the incoming fact as-is.
    pub fn accept() -> Self {
        Self {
            accept: true,
            emit: SmallVec::new(),
        }
    }

    /// Emit a new fact without applying the incoming one.
    pub fn emit(event: E) -> Self {
        Self::ignore().and_emit(event)
    }

    pub fn and_emit(mut self, event: E) -> Self {
        self.emit.push(event);
        self
    }

    pub fn is_noop(&self) -> bool {
        !self.accept && self.emit.is_empty()
    }
}

/// A per-entity state machine.
///
/// Machines are pure: no IO, no async. State changes only through
/// [`apply`](Machine::apply), so the current state is always the left fold
/// of the entity's fact history.
///
/// ```ignore
/// impl Machine for Counter {
///     type Id = String;
///     type Event = CounterEvent;
///     type Command = Increment;
///     type Rejection = std::convert::Infallible;
///     type Context = ();
///
///     const NAME: &'static str = "Counter";
///
///     fn route(event: &CounterEvent) -> Route<String> { .. }
///     fn command_route(cmd: &Increment) -> Route<String> { .. }
///     fn decide(&self, id: &String, envelope: &EventEnvelope<CounterEvent>, _: &()) -> Reaction<CounterEvent> { .. }
///     fn handle(&self, id: &String, cmd: &Increment, _: &()) -> Result<Emitted<CounterEvent>, Self::Rejection> { .. }
///     fn apply(&mut self, event: &CounterEvent) { .. }
/// }
/// ```
pub trait Machine: Default + Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Ord + Hash + fmt::Display + Send + Sync + 'static;
    type Event: Event;
    type Command: fmt::Debug + Send + Sync;
    type Rejection: std::error::Error + Send + Sync + 'static;
    /// Read-only settings shared by every entity of this kind.
    type Context: Send + Sync + 'static;

    /// Name used in logs, errors, and as the origin of emitted facts.
    const NAME: &'static str;

    /// Dispatch table: which entity, if any, reacts to this fact.
    ///
    /// Facts this machine emits itself must route to [`Route::Ignore`];
    /// they are applied at emission.
    fn route(event: &Self::Event) -> Route<Self::Id>;

    /// Which entity a command is addressed to.
    fn command_route(command: &Self::Command) -> Route<Self::Id>;

    /// React to an incoming fact.
    fn decide(
        &self,
        id: &Self::Id,
        envelope: &EventEnvelope<Self::Event>,
        ctx: &Self::Context,
    ) -> Reaction<Self::Event>;

    /// Validate a command against current state and produce its facts.
    fn handle(
        &self,
        id: &Self::Id,
        command: &Self::Command,
        ctx: &Self::Context,
    ) -> Result<Emitted<Self::Event>, Self::Rejection>;

    /// Fold one fact into state.
    fn apply(&mut self, event: &Self::Event);
}
