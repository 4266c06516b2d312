//! Per-state business logic contract.

use serde_json::Value;
use waypoint_core::FsmResult;

/// Result of advancing into a state with new input.
#[derive(Debug, Clone, PartialEq)]
pub struct Visited<T> {
    /// Returned to the caller, or fed as input to the next state on an
    /// internal hop.
    pub response: Option<Value>,
    pub data: T,
    /// Either [`TRANSITION_COMPLETE`](crate::types::TRANSITION_COMPLETE) or an
    /// event declared on the visited state.
    pub next_event: String,
}

/// Result of recomputing an already reached state.
#[derive(Debug, Clone, PartialEq)]
pub struct Revisited<T> {
    pub response: Option<Value>,
    pub data: T,
}

/// Business step behind one graph state.
///
/// Both methods may be re-invoked for input the engine already handed over
/// once (a client retry after a failed persist), so implementations must be
/// idempotent under retry.
pub trait StateHandler<T>: Send + Sync {
    /// Consume `input` and decide how the journey continues.
    fn visit(&self, journey_id: &str, journey_data: &T, input: Option<Value>)
        -> FsmResult<Visited<T>>;

    /// Rebuild the response for this state without new input. Used by resume
    /// and back navigation; never advances the graph.
    fn revisit(&self, journey_id: &str, journey_data: &T) -> FsmResult<Revisited<T>>;
}
