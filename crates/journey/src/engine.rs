use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use waypoint_core::config::JourneyConfig;
use waypoint_core::{FsmError, FsmResult};

use crate::graph::{Graph, GraphError, State};
use crate::lock::JourneyLocks;
use crate::store::JourneyStore;
use crate::types::{
    FsmRequest, FsmResponse, Journey, BACK_EVENT, RESUME_EVENT, START_EVENT, TRANSITION_COMPLETE,
};

const DEFAULT_MAX_INTERNAL_HOPS: usize = 64;

/// Drives journeys through a validated graph.
///
/// One `execute` call may run several handlers back to back (internal hops),
/// but persists the journey exactly once, after the last of them.
pub struct JourneyEngine<T> {
    graph: Arc<Graph<T>>,
    store: Arc<dyn JourneyStore<T>>,
    locks: Option<JourneyLocks>,
    max_internal_hops: usize,
}

impl<T> Clone for JourneyEngine<T> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            store: self.store.clone(),
            locks: self.locks.clone(),
            max_internal_hops: self.max_internal_hops,
        }
    }
}

impl<T> fmt::Debug for JourneyEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JourneyEngine")
            .field("graph", &self.graph)
            .field("serialized", &self.locks.is_some())
            .field("max_internal_hops", &self.max_internal_hops)
            .finish()
    }
}

impl<T> JourneyEngine<T> {
    pub fn new(graph: Graph<T>, store: Arc<dyn JourneyStore<T>>) -> Self {
        Self {
            graph: Arc::new(graph),
            store,
            locks: None,
            max_internal_hops: DEFAULT_MAX_INTERNAL_HOPS,
        }
    }

    pub fn from_config(graph: Graph<T>, store: Arc<dyn JourneyStore<T>>, config: &JourneyConfig) -> Self {
        let engine = Self::new(graph, store).with_max_internal_hops(config.max_internal_hops);
        if config.serialize_per_journey {
            engine.with_journey_locks(JourneyLocks::new())
        } else {
            engine
        }
    }

    /// Serialize calls on the same journey id through `locks`.
    pub fn with_journey_locks(mut self, locks: JourneyLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Caps handler invocations per call. Values below 1 are treated as 1.
    pub fn with_max_internal_hops(mut self, hops: usize) -> Self {
        self.max_internal_hops = hops.max(1);
        self
    }

    pub fn graph(&self) -> &Graph<T> {
        &self.graph
    }

    /// Runs one request to completion.
    pub fn execute(&self, request: FsmRequest) -> FsmResult<FsmResponse> {
        let result = match request.target().map(str::to_string) {
            None => self.start(request),
            Some(id) => match &self.locks {
                Some(locks) => locks.with_lock(&id, || self.continue_journey(&id, request)),
                None => self.continue_journey(&id, request),
            },
        };

        match &result {
            Ok(_) => metrics::counter!("journey.completed_calls").increment(1),
            Err(err) => {
                metrics::counter!("journey.errors").increment(1);
                debug!(code = err.code(), error = %err, "Journey request failed");
            }
        }
        result
    }

    fn start(&self, request: FsmRequest) -> FsmResult<FsmResponse> {
        if request.event != START_EVENT {
            return Err(FsmError::bypass("invalid journey error: wrong event"));
        }

        let mut journey = self.store.create()?;
        metrics::counter!("journey.started").increment(1);
        info!(journey_id = %journey.id, "Journey started");

        let outcome = self
            .traverse(&mut journey, self.graph.initial_state(), request.data)
            .and_then(|(state, response)| {
                self.store.save(&journey)?;
                Ok(self.respond(&journey, state, response))
            });

        if let Err(err) = &outcome {
            self.rollback(&journey.id, err);
        }
        outcome
    }

    /// Best-effort removal of a journey created by a call that then failed.
    fn rollback(&self, journey_id: &str, cause: &FsmError) {
        metrics::counter!("journey.rollbacks").increment(1);
        warn!(journey_id, error = %cause, "New journey failed, deleting record");
        if let Err(err) = self.store.delete(journey_id) {
            metrics::counter!("journey.rollback_failures").increment(1);
            warn!(journey_id, error = %err, "Rollback delete failed");
        }
    }

    fn continue_journey(&self, journey_id: &str, request: FsmRequest) -> FsmResult<FsmResponse> {
        let journey = self.store.get(journey_id)?;
        match request.event.as_str() {
            RESUME_EVENT => self.resume(journey),
            BACK_EVENT => self.back(journey),
            event => self.advance(journey, event, request.data),
        }
    }

    fn advance(&self, mut journey: Journey<T>, event: &str, input: Option<Value>) -> FsmResult<FsmResponse> {
        let current = self.current_state(&journey)?;
        let next = self.resolve(current, event)?;
        let (state, response) = self.traverse(&mut journey, next, input)?;
        self.store.save(&journey)?;
        Ok(self.respond(&journey, state, response))
    }

    /// Visits `first`, then keeps following the events handlers emit until one
    /// signals completion.
    fn traverse<'g>(
        &'g self,
        journey: &mut Journey<T>,
        first: &'g State<T>,
        input: Option<Value>,
    ) -> FsmResult<(&'g State<T>, Option<Value>)> {
        let mut state = first;
        let mut input = input;

        for hop in 0..self.max_internal_hops {
            debug!(journey_id = %journey.id, state = state.name(), hop, "Visiting state");
            let visited = state.handler().visit(&journey.id, &journey.data, input)?;
            metrics::counter!("journey.visits").increment(1);

            journey.data = visited.data;
            journey.enter(state.name(), state.is_checkpoint());

            if visited.next_event == TRANSITION_COMPLETE {
                return Ok((state, visited.response));
            }
            state = self.resolve(state, &visited.next_event)?;
            input = visited.response;
        }

        Err(FsmError::internal(format!(
            "journey {} exceeded {} internal transitions without completing",
            journey.id, self.max_internal_hops
        )))
    }

    fn resume(&self, journey: Journey<T>) -> FsmResult<FsmResponse> {
        let checkpoint = self
            .graph
            .state(&journey.last_checkpoint_stage)
            .map_err(|_| {
                FsmError::internal(format!(
                    "cannot find checkpoint state '{}'",
                    journey.last_checkpoint_stage
                ))
            })?;
        self.revisit(journey, checkpoint)
    }

    fn back(&self, journey: Journey<T>) -> FsmResult<FsmResponse> {
        let current = self.current_state(&journey)?;
        let previous = self
            .graph
            .next_state(current, BACK_EVENT)
            .map_err(|err| FsmError::internal(format!("cannot go back: {err}")))?;
        self.revisit(journey, previous)
    }

    fn revisit(&self, mut journey: Journey<T>, state: &State<T>) -> FsmResult<FsmResponse> {
        debug!(journey_id = %journey.id, state = state.name(), "Revisiting state");
        let revisited = state.handler().revisit(&journey.id, &journey.data)?;
        metrics::counter!("journey.revisits").increment(1);

        journey.data = revisited.data;
        journey.enter(state.name(), state.is_checkpoint());
        self.store.save(&journey)?;
        Ok(self.respond(&journey, state, revisited.response))
    }

    fn current_state(&self, journey: &Journey<T>) -> FsmResult<&State<T>> {
        self.graph.state(&journey.current_stage).map_err(|_| {
            FsmError::internal(format!(
                "invalid journey error: cannot find current state '{}'",
                journey.current_stage
            ))
        })
    }

    /// Undeclared events are the caller's fault; a declared edge into a
    /// missing state is a configuration defect.
    fn resolve(&self, from: &State<T>, event: &str) -> FsmResult<&State<T>> {
        self.graph.next_state(from, event).map_err(|err| match err {
            e @ GraphError::NoSuchTransition { .. } => FsmError::bypass(e.to_string()),
            other => FsmError::internal(format!("cannot find next state: {other}")),
        })
    }

    fn respond(&self, journey: &Journey<T>, state: &State<T>, data: Option<Value>) -> FsmResponse {
        FsmResponse {
            journey_id: journey.id.clone(),
            data,
            next_screen: state.next_screen().map(str::to_string),
            meta_data: state.meta_data().cloned(),
        }
    }
}
