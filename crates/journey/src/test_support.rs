//! Recording fakes for the engine's collaborators.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::Value;
use waypoint_core::{FsmError, FsmResult};

use crate::handler::{Revisited, StateHandler, Visited};
use crate::store::JourneyStore;
use crate::types::Journey;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HandlerCall<T> {
    Visit {
        journey_id: String,
        data: T,
        input: Option<Value>,
    },
    Revisit {
        journey_id: String,
        data: T,
    },
}

/// Handler that replays queued results in order and records every call.
pub(crate) struct ScriptedHandler<T> {
    visits: Mutex<VecDeque<FsmResult<Visited<T>>>>,
    revisits: Mutex<VecDeque<FsmResult<Revisited<T>>>>,
    calls: Mutex<Vec<HandlerCall<T>>>,
}

impl<T> ScriptedHandler<T> {
    pub(crate) fn new() -> Self {
        Self {
            visits: Mutex::new(VecDeque::new()),
            revisits: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on_visit(self, response: Option<Value>, data: T, next_event: &str) -> Self {
        self.visits.lock().push_back(Ok(Visited {
            response,
            data,
            next_event: next_event.to_string(),
        }));
        self
    }

    pub(crate) fn on_visit_err(self, err: FsmError) -> Self {
        self.visits.lock().push_back(Err(err));
        self
    }

    pub(crate) fn on_revisit(self, response: Option<Value>, data: T) -> Self {
        self.revisits
            .lock()
            .push_back(Ok(Revisited { response, data }));
        self
    }

    pub(crate) fn on_revisit_err(self, err: FsmError) -> Self {
        self.revisits.lock().push_back(Err(err));
        self
    }
}

impl<T: Clone> ScriptedHandler<T> {
    pub(crate) fn calls(&self) -> Vec<HandlerCall<T>> {
        self.calls.lock().clone()
    }
}

impl<T: Clone + Send + Sync> StateHandler<T> for ScriptedHandler<T> {
    fn visit(&self, journey_id: &str, journey_data: &T, input: Option<Value>) -> FsmResult<Visited<T>> {
        self.calls.lock().push(HandlerCall::Visit {
            journey_id: journey_id.to_string(),
            data: journey_data.clone(),
            input,
        });
        self.visits
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FsmError::internal("unexpected visit")))
    }

    fn revisit(&self, journey_id: &str, journey_data: &T) -> FsmResult<Revisited<T>> {
        self.calls.lock().push(HandlerCall::Revisit {
            journey_id: journey_id.to_string(),
            data: journey_data.clone(),
        });
        self.revisits
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FsmError::internal("unexpected revisit")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoreCall<T> {
    Create,
    Get(String),
    Save(Journey<T>),
    Delete(String),
}

/// In-memory journey store that records calls and can be told to fail.
pub(crate) struct RecordingStore<T> {
    next_id: String,
    records: Mutex<HashMap<String, Journey<T>>>,
    calls: Mutex<Vec<StoreCall<T>>>,
    pub(crate) fail_create: Option<FsmError>,
    pub(crate) fail_save: Option<FsmError>,
    pub(crate) fail_delete: Option<FsmError>,
}

impl<T: Clone + Default> RecordingStore<T> {
    pub(crate) fn new(next_id: &str) -> Self {
        Self {
            next_id: next_id.to_string(),
            records: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_create: None,
            fail_save: None,
            fail_delete: None,
        }
    }

    pub(crate) fn with_journey(self, journey: Journey<T>) -> Self {
        self.records.lock().insert(journey.id.clone(), journey);
        self
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall<T>> {
        self.calls.lock().clone()
    }

    pub(crate) fn saves(&self) -> Vec<Journey<T>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Save(j) => Some(j),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn stored(&self, id: &str) -> Option<Journey<T>> {
        self.records.lock().get(id).cloned()
    }
}

impl<T: Clone + Default + Send + Sync> JourneyStore<T> for RecordingStore<T> {
    fn create(&self) -> FsmResult<Journey<T>> {
        self.calls.lock().push(StoreCall::Create);
        if let Some(err) = &self.fail_create {
            return Err(err.clone());
        }
        let journey = Journey::new(self.next_id.clone());
        self.records.lock().insert(journey.id.clone(), journey.clone());
        Ok(journey)
    }

    fn get(&self, id: &str) -> FsmResult<Journey<T>> {
        self.calls.lock().push(StoreCall::Get(id.to_string()));
        self.records
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| FsmError::not_found("journey not found"))
    }

    fn save(&self, journey: &Journey<T>) -> FsmResult<()> {
        self.calls.lock().push(StoreCall::Save(journey.clone()));
        if let Some(err) = &self.fail_save {
            return Err(err.clone());
        }
        self.records.lock().insert(journey.id.clone(), journey.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> FsmResult<()> {
        self.calls.lock().push(StoreCall::Delete(id.to_string()));
        if let Some(err) = &self.fail_delete {
            return Err(err.clone());
        }
        self.records.lock().remove(id);
        Ok(())
    }
}
