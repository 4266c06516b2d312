//! Static journey graph: named states, event-labelled edges, checkpoint flags.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::handler::StateHandler;
use crate::types::RESERVED_EVENTS;

/// Construction and lookup failures of a [`Graph`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("no final state found")]
    NoTerminalState,

    #[error("multiple final states found: {0:?}")]
    MultipleTerminalStates(Vec<String>),

    #[error("state name must not be empty")]
    EmptyStateName,

    #[error("state {0} declared more than once")]
    DuplicateState(String),

    #[error("state {state} declares event {event} more than once")]
    DuplicateEvent { state: String, event: String },

    #[error("state {state} uses reserved event {event} as a transition")]
    ReservedEvent { state: String, event: String },

    #[error("cannot find state {0}")]
    StateNotFound(String),

    #[error("invalid event {event} for state {state}")]
    NoSuchTransition { state: String, event: String },
}

/// A directed, event-labelled edge scoped to one source state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub event: String,
    pub destination: String,
}

/// A node of the graph together with the handler that executes it.
pub struct State<T> {
    name: String,
    handler: Arc<dyn StateHandler<T>>,
    transitions: Vec<Transition>,
    is_checkpoint: bool,
    next_screen: Option<String>,
    meta_data: Option<Value>,
}

impl<T> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("transitions", &self.transitions)
            .field("is_checkpoint", &self.is_checkpoint)
            .field("next_screen", &self.next_screen)
            .finish()
    }
}

impl<T> State<T> {
    pub fn new(name: impl Into<String>, handler: Arc<dyn StateHandler<T>>) -> Self {
        Self {
            name: name.into(),
            handler,
            transitions: Vec::new(),
            is_checkpoint: false,
            next_screen: None,
            meta_data: None,
        }
    }

    /// Adds an outgoing edge. Declaration order is lookup order.
    pub fn on(mut self, event: impl Into<String>, destination: impl Into<String>) -> Self {
        self.transitions.push(Transition {
            event: event.into(),
            destination: destination.into(),
        });
        self
    }

    /// Marks the state as a safe resumption point.
    pub fn checkpoint(mut self) -> Self {
        self.is_checkpoint = true;
        self
    }

    pub fn with_next_screen(mut self, screen: impl Into<String>) -> Self {
        self.next_screen = Some(screen.into());
        self
    }

    pub fn with_meta_data(mut self, meta_data: Value) -> Self {
        self.meta_data = Some(meta_data);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn StateHandler<T>> {
        &self.handler
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn is_checkpoint(&self) -> bool {
        self.is_checkpoint
    }

    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn next_screen(&self) -> Option<&str> {
        self.next_screen.as_deref()
    }

    pub fn meta_data(&self) -> Option<&Value> {
        self.meta_data.as_ref()
    }

    /// First declared edge labelled `event`.
    pub fn transition(&self, event: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.event == event)
    }

    fn duplicate_events(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.transitions
            .iter()
            .filter(|t| !seen.insert(t.event.as_str()))
            .map(|t| t.event.as_str())
            .collect()
    }
}

/// Immutable state graph, validated once at startup.
///
/// Dangling edge targets and unreachable states are not rejected here; they
/// surface as lookup failures when a journey runs into them.
pub struct Graph<T> {
    /// Index 0 is the initial state.
    states: Vec<State<T>>,
    index: HashMap<String, usize>,
    terminal: usize,
}

impl<T> fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("initial", &self.initial_state().name)
            .field("terminal", &self.terminal_state().name)
            .field("states", &self.states.len())
            .finish()
    }
}

impl<T> Graph<T> {
    /// Builds the graph, requiring exactly one state without outgoing edges.
    ///
    /// An event declared twice on one state is accepted; the first edge wins
    /// and a warning is logged.
    pub fn build(initial: State<T>, others: Vec<State<T>>) -> Result<Self, GraphError> {
        Self::assemble(initial, others, false)
    }

    /// Like [`Graph::build`], but also rejects duplicate events on one state
    /// and edges labelled with a reserved event.
    pub fn build_strict(initial: State<T>, others: Vec<State<T>>) -> Result<Self, GraphError> {
        Self::assemble(initial, others, true)
    }

    fn assemble(initial: State<T>, others: Vec<State<T>>, strict: bool) -> Result<Self, GraphError> {
        let mut states = Vec::with_capacity(others.len() + 1);
        states.push(initial);
        states.extend(others);

        let mut index = HashMap::with_capacity(states.len());
        for (i, state) in states.iter().enumerate() {
            if state.name.is_empty() {
                return Err(GraphError::EmptyStateName);
            }
            if index.insert(state.name.clone(), i).is_some() {
                return Err(GraphError::DuplicateState(state.name.clone()));
            }
        }

        let terminals: Vec<usize> = states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_terminal())
            .map(|(i, _)| i)
            .collect();
        let terminal = match terminals.as_slice() {
            [] => return Err(GraphError::NoTerminalState),
            [only] => *only,
            _ => {
                return Err(GraphError::MultipleTerminalStates(
                    terminals.iter().map(|&i| states[i].name.clone()).collect(),
                ))
            }
        };

        for state in &states {
            if let Some(event) = state.duplicate_events().first() {
                if strict {
                    return Err(GraphError::DuplicateEvent {
                        state: state.name.clone(),
                        event: event.to_string(),
                    });
                }
                warn!(state = %state.name, event = %event, "Duplicate event declared, first edge wins");
            }
            if strict {
                if let Some(t) = state
                    .transitions
                    .iter()
                    .find(|t| RESERVED_EVENTS.contains(&t.event.as_str()))
                {
                    return Err(GraphError::ReservedEvent {
                        state: state.name.clone(),
                        event: t.event.clone(),
                    });
                }
            }
        }

        Ok(Self {
            states,
            index,
            terminal,
        })
    }

    pub fn initial_state(&self) -> &State<T> {
        &self.states[0]
    }

    pub fn terminal_state(&self) -> &State<T> {
        &self.states[self.terminal]
    }

    pub fn state(&self, name: &str) -> Result<&State<T>, GraphError> {
        self.index
            .get(name)
            .map(|&i| &self.states[i])
            .ok_or_else(|| GraphError::StateNotFound(name.to_string()))
    }

    /// Destination of the first edge of `state` labelled `event`.
    pub fn next_state(&self, state: &State<T>, event: &str) -> Result<&State<T>, GraphError> {
        let transition = state
            .transition(event)
            .ok_or_else(|| GraphError::NoSuchTransition {
                state: state.name.clone(),
                event: event.to_string(),
            })?;
        self.state(&transition.destination)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &State<T>> {
        self.states.iter()
    }
}
