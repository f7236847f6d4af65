//! # Tarmac
//!
//! A deterministic, fact-driven coordination layer where per-entity machines
//! decide and facts cascade.
//!
//! ## Core Concepts
//!
//! Tarmac separates **facts** from **intent**:
//! - [`Event`] = Facts (what happened)
//! - `Machine::Command` = Intent (a request that may be rejected)
//!
//! Every entity (one flight, one aircraft, one boarding record) is its own
//! [`Machine`]. Its state is never written directly: commands and incoming
//! facts produce facts, and state is the left fold of those facts.
//!
//! ## Architecture
//!
//! ```text
//! Intake (adapters, tower, callers)
//!     │
//!     ▼ dispatch()
//! Engine ───────────────────────────────────────┐
//!     │                                         │
//!     ├─► Repository<A>.react() ─► [] ──────┐   │
//!     │                                     │   │
//!     ├─► Repository<B>.react() ─► [FactX] ─┤   │
//!     │                                     │   │
//!     └─► Repository<C>.react() ─► [FactY] ─┤   │
//!                                           │   │
//!                                           ▼   │
//!                                       EventBus│
//!                                           │   │
//!                                           └───┘ cascade until quiet
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Facts are immutable** - Once applied they are only ever appended to history
//! 2. **One writer per entity** - Facts for one id apply one at a time, in order
//! 3. **No global lock** - Different ids proceed in parallel
//! 4. **Machines are pure** - No IO, no async, state changes only via `apply`
//! 5. **Machines never see their own facts** - Emitted facts are applied at emission
//! 6. **Reactions are idempotent** - Duplicate delivery is a no-op, not an error
//!
//! ## Guarantees
//!
//! - **Synchronous settlement**: `dispatch` returns after every derived fact is applied
//! - **At-most-once observation**: Slow bus subscribers may miss facts
//! - **In-memory only**: Facts are not persisted by tarmac
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tarmac_core::{Engine, EventEnvelope, Origin, Repository};
//!
//! let flights = Arc::new(Repository::<Flight>::with_context(policy));
//! let boardings = Arc::new(Repository::<Boarding>::new());
//!
//! let engine = Engine::builder()
//!     .with_reactor(flights.clone())
//!     .with_reactor(boardings.clone())
//!     .build();
//!
//! let facts = flights.execute(&schedule, &Origin::new("Dispatch"), now)?;
//! engine.propagate(facts);
//!
//! engine.dispatch(EventEnvelope::new(Origin::new("Security"), now, boarded))?;
//! ```

mod bus;
mod core;
mod engine;
mod error;
mod machine;
mod repository;

#[cfg(test)]
mod testkit;

pub use crate::core::{Event, EventEnvelope, Origin};

pub use crate::error::{CommandError, ReactError};

pub use machine::{Emitted, Machine, Reaction, Route};

pub use repository::Repository;

pub use bus::{EventBus, DEFAULT_BUS_CAPACITY};

pub use engine::{Engine, EngineBuilder, Reactor, MAX_CASCADE};

// Re-export commonly used external types
pub use smallvec::smallvec;
