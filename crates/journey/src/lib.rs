//! Resumable journeys: caller-defined state graphs driven one request at a
//! time and persisted once per call.

pub mod engine;
pub mod graph;
pub mod handler;
pub mod lock;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::JourneyEngine;
pub use graph::{Graph, GraphError, State, Transition};
pub use handler::{Revisited, StateHandler, Visited};
pub use lock::JourneyLocks;
pub use store::{uuid_generator, IdGenerator, JourneyStore, KeyValueJourneyStore};
pub use types::{FsmRequest, FsmResponse, Journey};
