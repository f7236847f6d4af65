//! Concurrent storage of machine instances, one writer per entity id.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::core::{EventEnvelope, Origin};
use crate::engine::Reactor;
use crate::error::{CommandError, ReactError};
use crate::machine::{Emitted, Machine, Route};

/// One entity: its projected state and the facts it was folded from.
#[derive(Debug, Clone)]
struct Entity<M: Machine> {
    state: M,
    history: Vec<EventEnvelope<M::Event>>,
    /// Ids of facts this entity applied or reacted to.
    handled: HashSet<Uuid>,
}

impl<M: Machine> Default for Entity<M> {
    fn default() -> Self {
        Self {
            state: M::default(),
            history: Vec::new(),
            handled: HashSet::new(),
        }
    }
}

impl<M: Machine> Entity<M> {
    fn record(&mut self, envelope: EventEnvelope<M::Event>) {
        self.state.apply(&envelope.event);
        self.handled.insert(envelope.id);
        self.handled.extend(envelope.caused_by);
        self.history.push(envelope);
    }
}

/// All instances of one kind of machine.
///
/// Every mutation of an entity happens while holding that entity's map
/// entry, so facts and commands for one id apply strictly one at a time.
/// Different ids live in different shards and proceed in parallel.
pub struct Repository<M: Machine> {
    entities: DashMap<M::Id, Entity<M>>,
    context: M::Context,
}

impl<M: Machine> fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("machine", &M::NAME)
            .field("entities", &self.entities.len())
            .finish()
    }
}

impl<M: Machine> Repository<M>
where
    M::Context: Default,
{
    pub fn new() -> Self {
        Self::with_context(M::Context::default())
    }
}

impl<M: Machine> Default for Repository<M>
where
    M::Context: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Machine> Repository<M> {
    pub fn with_context(context: M::Context) -> Self {
        Self {
            entities: DashMap::new(),
            context,
        }
    }

    pub fn context(&self) -> &M::Context {
        &self.context
    }

    /// Handle a command and apply the facts it produces.
    ///
    /// Returns the applied facts so the caller can propagate them.
    pub fn execute(
        &self,
        command: &M::Command,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope<M::Event>>, CommandError<M::Rejection>> {
        match M::command_route(command) {
            Route::Create(id) => match self.entities.entry(id.clone()) {
                Entry::Occupied(_) => Err(CommandError::AlreadyExists {
                    machine: M::NAME,
                    id: id.to_string(),
                }),
                Entry::Vacant(slot) => {
                    let mut entity = Entity::default();
                    let applied = self.run_command(&id, &mut entity, command, origin, at)?;
                    slot.insert(entity);
                    Ok(applied)
                }
            },
            Route::Existing(id) => {
                let mut entity =
                    self.entities
                        .get_mut(&id)
                        .ok_or_else(|| CommandError::UnknownSubject {
                            machine: M::NAME,
                            id: id.to_string(),
                        })?;
                self.run_command(&id, entity.value_mut(), command, origin, at)
            }
            Route::Upsert(id) => {
                let mut entity = self.entities.entry(id.clone()).or_default();
                self.run_command(&id, entity.value_mut(), command, origin, at)
            }
            Route::Ignore | Route::Broadcast => Err(CommandError::Unroutable {
                machine: M::NAME,
                command: format!("{command:?}"),
            }),
        }
    }

    fn run_command(
        &self,
        id: &M::Id,
        entity: &mut Entity<M>,
        command: &M::Command,
        origin: &Origin,
        at: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope<M::Event>>, CommandError<M::Rejection>> {
        let facts: Emitted<M::Event> = entity
            .state
            .handle(id, command, &self.context)
            .map_err(|source| CommandError::Rejected {
                machine: M::NAME,
                id: id.to_string(),
                source,
            })?;

        Ok(facts
            .into_iter()
            .map(|event| {
                let envelope = EventEnvelope::new(origin.clone(), at, event);
                debug!(
                    machine = M::NAME,
                    id = %id,
                    kind = envelope.kind(),
                    "command fact applied"
                );
                entity.record(envelope.clone());
                envelope
            })
            .collect())
    }

    /// Apply an incoming fact to whichever entities it is routed to.
    ///
    /// Returns the facts emitted in reaction, already applied to their
    /// emitters.
    pub fn react(
        &self,
        envelope: &EventEnvelope<M::Event>,
    ) -> Result<Vec<EventEnvelope<M::Event>>, ReactError> {
        match M::route(&envelope.event) {
            Route::Ignore => Ok(Vec::new()),
            Route::Existing(id) => {
                let mut entity =
                    self.entities
                        .get_mut(&id)
                        .ok_or_else(|| ReactError::UnknownSubject {
                            machine: M::NAME,
                            kind: envelope.kind(),
                            id: id.to_string(),
                        })?;
                Ok(self.react_one(&id, entity.value_mut(), envelope))
            }
            Route::Create(id) | Route::Upsert(id) => {
                let mut entity = self.entities.entry(id.clone()).or_default();
                Ok(self.react_one(&id, entity.value_mut(), envelope))
            }
            Route::Broadcast => {
                let mut per_entity: Vec<(M::Id, Vec<EventEnvelope<M::Event>>)> = Vec::new();
                for mut item in self.entities.iter_mut() {
                    let (id, entity) = item.pair_mut();
                    let emitted = self.react_one(id, entity, envelope);
                    if !emitted.is_empty() {
                        per_entity.push((id.clone(), emitted));
                    }
                }
                // Shard iteration order is arbitrary; publish in id order.
                per_entity.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(per_entity.into_iter().flat_map(|(_, e)| e).collect())
            }
        }
    }

    fn react_one(
        &self,
        id: &M::Id,
        entity: &mut Entity<M>,
        envelope: &EventEnvelope<M::Event>,
    ) -> Vec<EventEnvelope<M::Event>> {
        // A redelivered fact keeps its id; the first delivery already counted.
        if entity.handled.contains(&envelope.id) {
            debug!(
                machine = M::NAME,
                id = %id,
                kind = envelope.kind(),
                fact = %envelope.id,
                "fact already handled"
            );
            return Vec::new();
        }

        let reaction = entity.state.decide(id, envelope, &self.context);
        if reaction.is_noop() {
            debug!(
                machine = M::NAME,
                id = %id,
                kind = envelope.kind(),
                fact = %envelope.id,
                "fact ignored"
            );
            return Vec::new();
        }

        if reaction.accept {
            debug!(
                machine = M::NAME,
                id = %id,
                kind = envelope.kind(),
                fact = %envelope.id,
                "fact applied"
            );
            entity.record(envelope.clone());
        }

        let origin = Origin::new(M::NAME);
        reaction
            .emit
            .into_iter()
            .map(|event| {
                let derived = envelope.derive(origin.clone(), event);
                debug!(
                    machine = M::NAME,
                    id = %id,
                    kind = derived.kind(),
                    caused_by = %envelope.id,
                    "fact emitted"
                );
                entity.record(derived.clone());
                derived
            })
            .collect()
    }

    /// Current projection of one entity.
    pub fn get(&self, id: &M::Id) -> Option<M> {
        self.entities.get(id).map(|entity| entity.state.clone())
    }

    pub fn contains(&self, id: &M::Id) -> bool {
        self.entities.contains_key(id)
    }

    /// Every fact folded into one entity, oldest first.
    pub fn history(&self, id: &M::Id) -> Option<Vec<EventEnvelope<M::Event>>> {
        self.entities.get(id).map(|entity| entity.history.clone())
    }

    /// Point-in-time copy of every entity, ordered by id.
    ///
    /// Each entity is read consistently, but the snapshot as a whole may
    /// interleave with concurrent updates to other entities.
    pub fn snapshot(&self) -> Vec<(M::Id, M)> {
        let mut all: Vec<(M::Id, M)> = self
            .entities
            .iter()
            .map(|entity| (entity.key().clone(), entity.state.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<M: Machine> Reactor<M::Event> for Repository<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn react(
        &self,
        envelope: &EventEnvelope<M::Event>,
    ) -> Result<Vec<EventEnvelope<M::Event>>, ReactError> {
        Repository::react(self, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{at, Counter, CounterCommand, Fact, Notebook};

    fn origin() -> Origin {
        Origin::new("test")
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let repo = Repository::<Counter>::with_context(3);
        repo.execute(&CounterCommand::Open("a".into()), &origin(), at(0))
            .unwrap();

        let err = repo
            .execute(&CounterCommand::Open("a".into()), &origin(), at(1))
            .unwrap_err();

        assert!(matches!(err, CommandError::AlreadyExists { machine: "Counter", .. }));
        assert_eq!(repo.history(&"a".to_string()).unwrap().len(), 1);
    }

    #[test]
    fn test_existing_route_requires_entity() {
        let repo = Repository::<Counter>::with_context(3);
        let err = repo
            .execute(&CounterCommand::Reset("ghost".into()), &origin(), at(0))
            .unwrap_err();
        assert!(matches!(err, CommandError::UnknownSubject { .. }));

        let bump = EventEnvelope::new(origin(), at(0), Fact::Bumped { id: "ghost".into() });
        let err = repo.react(&bump).unwrap_err();
        assert_eq!(
            err,
            ReactError::UnknownSubject {
                machine: "Counter",
                kind: "Bumped",
                id: "ghost".into(),
            }
        );
        assert!(repo.is_empty());
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let repo = Repository::<Counter>::with_context(1);
        repo.execute(&CounterCommand::Open("a".into()), &origin(), at(0))
            .unwrap();
        repo.react(&EventEnvelope::new(origin(), at(1), Fact::Bumped { id: "a".into() }))
            .unwrap();

        let err = repo
            .execute(&CounterCommand::Reset("a".into()), &origin(), at(2))
            .unwrap_err();

        assert!(matches!(err, CommandError::Rejected { .. }));
        assert_eq!(repo.get(&"a".to_string()).unwrap().count, 1);
    }

    #[test]
    fn test_reaction_emits_once_and_records_history() {
        let repo = Repository::<Counter>::with_context(2);
        repo.execute(&CounterCommand::Open("a".into()), &origin(), at(0))
            .unwrap();

        let bump = || EventEnvelope::new(origin(), at(1), Fact::Bumped { id: "a".into() });
        assert!(repo.react(&bump()).unwrap().is_empty());

        let emitted = repo.react(&bump()).unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].event, Fact::Full { id: "a".into(), total: 2 });
        assert_eq!(emitted[0].origin.as_str(), "Counter");
        assert!(emitted[0].caused_by.is_some());

        // Past the cap the bump is accepted but nothing is re-emitted.
        assert!(repo.react(&bump()).unwrap().is_empty());

        let kinds: Vec<_> = repo
            .history(&"a".to_string())
            .unwrap()
            .iter()
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, ["Opened", "Bumped", "Bumped", "Full", "Bumped"]);
    }

    #[test]
    fn test_redelivered_fact_is_handled_once() {
        let repo = Repository::<Counter>::with_context(2);
        repo.execute(&CounterCommand::Open("a".into()), &origin(), at(0))
            .unwrap();
        repo.execute(&CounterCommand::Open("b".into()), &origin(), at(0))
            .unwrap();

        let bump = EventEnvelope::new(origin(), at(1), Fact::Bumped { id: "a".into() });
        repo.react(&bump).unwrap();
        repo.react(&bump).unwrap();
        assert_eq!(repo.get(&"a".to_string()).unwrap().count, 1);

        // Each entity remembers a broadcast fact on its own.
        let all = EventEnvelope::new(origin(), at(2), Fact::BumpAll);
        assert_eq!(repo.react(&all).unwrap().len(), 1);
        assert!(repo.react(&all).unwrap().is_empty());
        assert_eq!(repo.get(&"a".to_string()).unwrap().count, 2);
        assert_eq!(repo.get(&"b".to_string()).unwrap().count, 1);
    }

    #[test]
    fn test_reaction_without_accept_still_dedupes() {
        let repo = Repository::<Notebook>::new();
        let full = EventEnvelope::new(origin(), at(1), Fact::Full { id: "a".into(), total: 2 });

        assert_eq!(repo.react(&full).unwrap().len(), 1);
        assert!(repo.react(&full).unwrap().is_empty());
        assert_eq!(repo.history(&"a".to_string()).unwrap().len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_every_entity_in_id_order() {
        let repo = Repository::<Counter>::with_context(1);
        for id in ["c", "a", "b"] {
            repo.execute(&CounterCommand::Open(id.into()), &origin(), at(0))
                .unwrap();
        }

        let emitted = repo
            .react(&EventEnvelope::new(origin(), at(1), Fact::BumpAll))
            .unwrap();

        let ids: Vec<_> = emitted
            .iter()
            .map(|e| match &e.event {
                Fact::Full { id, .. } => id.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_projection_is_fold_of_history() {
        let repo = Repository::<Counter>::with_context(10);
        repo.execute(&CounterCommand::Open("a".into()), &origin(), at(0))
            .unwrap();
        let mut rng = fastrand::Rng::with_seed(7);
        for i in 0..rng.usize(5..40) {
            let fact = if rng.bool() {
                Fact::Bumped { id: "a".into() }
            } else {
                Fact::BumpAll
            };
            repo.react(&EventEnvelope::new(origin(), at(i as i64), fact))
                .unwrap();
        }

        let mut replayed = Counter::default();
        for envelope in repo.history(&"a".to_string()).unwrap() {
            replayed.apply(&envelope.event);
        }
        assert_eq!(replayed, repo.get(&"a".to_string()).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_serialize_per_id() {
        let repo = std::sync::Arc::new(Repository::<Counter>::with_context(usize::MAX));
        for id in ["a", "b"] {
            repo.execute(&CounterCommand::Open(id.into()), &origin(), at(0))
                .unwrap();
        }

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                let id = if worker % 2 == 0 { "a" } else { "b" };
                for _ in 0..250 {
                    repo.react(&EventEnvelope::new(origin(), at(1), Fact::Bumped { id: id.into() }))
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(repo.get(&"a".to_string()).unwrap().count, 1000);
        assert_eq!(repo.get(&"b".to_string()).unwrap().count, 1000);
        assert_eq!(repo.history(&"a".to_string()).unwrap().len(), 1001);
    }
}
