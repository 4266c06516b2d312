use serde::{Deserialize, Serialize};

/// Event that opens a new journey. Only valid on requests without a journey id.
pub const START_EVENT: &str = "Start";

/// Event that recomputes the response of the last checkpoint.
pub const RESUME_EVENT: &str = "Resume";

/// Event that follows the current state's backward edge.
pub const BACK_EVENT: &str = "Back";

/// Next-event signal a handler returns to hand control back to the caller.
pub const TRANSITION_COMPLETE: &str = "TransitionComplete";

/// Events with engine-level meaning. `Back` is excluded: it is declared as an
/// ordinary edge on states that support backward navigation.
pub const RESERVED_EVENTS: [&str; 3] = [START_EVENT, RESUME_EVENT, TRANSITION_COMPLETE];

/// One running instance of a state graph.
///
/// Empty stage names mean "not yet reached".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey<T> {
    #[serde(rename = "jID")]
    pub id: String,
    #[serde(default)]
    pub current_stage: String,
    #[serde(default)]
    pub last_checkpoint_stage: String,
    pub data: T,
}

impl<T: Default> Journey<T> {
    /// A journey that has not visited any state yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            current_stage: String::new(),
            last_checkpoint_stage: String::new(),
            data: T::default(),
        }
    }
}

impl<T> Journey<T> {
    /// Records that `state` was just executed.
    pub(crate) fn enter(&mut self, state: &str, is_checkpoint: bool) {
        self.current_stage = state.to_string();
        if is_checkpoint {
            self.last_checkpoint_stage = state.to_string();
        }
    }

    pub fn has_started(&self) -> bool {
        !self.current_stage.is_empty()
    }
}

/// A single call into the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsmRequest {
    #[serde(rename = "jID", default, skip_serializing_if = "Option::is_none")]
    pub journey_id: Option<String>,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl FsmRequest {
    /// Request that opens a new journey.
    pub fn start(data: Option<serde_json::Value>) -> Self {
        Self {
            journey_id: None,
            event: START_EVENT.to_string(),
            data,
        }
    }

    pub fn event(
        journey_id: impl Into<String>,
        event: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            journey_id: Some(journey_id.into()),
            event: event.into(),
            data,
        }
    }

    pub fn resume(journey_id: impl Into<String>) -> Self {
        Self::event(journey_id, RESUME_EVENT, None)
    }

    pub fn back(journey_id: impl Into<String>) -> Self {
        Self::event(journey_id, BACK_EVENT, None)
    }

    /// The journey id, treating an empty string as absent.
    pub fn target(&self) -> Option<&str> {
        self.journey_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// What a caller gets back: the last executed state's response and display hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsmResponse {
    #[serde(rename = "jID")]
    pub journey_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<serde_json::Value>,
}
