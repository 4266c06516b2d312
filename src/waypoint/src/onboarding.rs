//! Demo onboarding journey served by the binary.
//!
//! Welcome (checkpoint) -Next-> Profile -INTERNAL_Verify-> Verify
//! -INTERNAL_Review-> Review (checkpoint) -Confirm-> Done.
//! Profile and Review can step back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use waypoint_core::{FsmError, FsmResult};
use waypoint_journey::handler::{Revisited, StateHandler, Visited};
use waypoint_journey::types::{BACK_EVENT, TRANSITION_COMPLETE};
use waypoint_journey::{Graph, GraphError, State};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub verified: bool,
    pub completed: bool,
}

fn field(input: &Option<Value>, key: &str) -> Option<String> {
    input
        .as_ref()
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn done(response: Value, data: OnboardingData) -> FsmResult<Visited<OnboardingData>> {
    Ok(Visited {
        response: Some(response),
        data,
        next_event: TRANSITION_COMPLETE.to_string(),
    })
}

struct Welcome;

impl StateHandler<OnboardingData> for Welcome {
    fn visit(&self, _: &str, data: &OnboardingData, input: Option<Value>) -> FsmResult<Visited<OnboardingData>> {
        let mut data = data.clone();
        if let Some(name) = field(&input, "name") {
            data.name = Some(name);
        }
        done(json!({ "greeting": greeting(&data) }), data)
    }

    fn revisit(&self, _: &str, data: &OnboardingData) -> FsmResult<Revisited<OnboardingData>> {
        Ok(Revisited {
            response: Some(json!({ "greeting": greeting(data) })),
            data: data.clone(),
        })
    }
}

fn greeting(data: &OnboardingData) -> String {
    match &data.name {
        Some(name) => format!("Welcome, {name}"),
        None => "Welcome".to_string(),
    }
}

struct Profile;

impl StateHandler<OnboardingData> for Profile {
    fn visit(&self, _: &str, data: &OnboardingData, input: Option<Value>) -> FsmResult<Visited<OnboardingData>> {
        let email = field(&input, "email").ok_or_else(|| FsmError::bad_request("email is required"))?;
        let mut data = data.clone();
        data.email = Some(email.clone());
        data.verified = false;
        Ok(Visited {
            response: Some(json!({ "email": email })),
            data,
            next_event: "INTERNAL_Verify".to_string(),
        })
    }

    fn revisit(&self, _: &str, data: &OnboardingData) -> FsmResult<Revisited<OnboardingData>> {
        Ok(Revisited {
            response: Some(json!({ "email": data.email })),
            data: data.clone(),
        })
    }
}

/// Runs without caller input, straight after Profile.
struct Verify;

impl StateHandler<OnboardingData> for Verify {
    fn visit(&self, _: &str, data: &OnboardingData, input: Option<Value>) -> FsmResult<Visited<OnboardingData>> {
        let email = field(&input, "email").unwrap_or_default();
        let mut data = data.clone();
        data.verified = email.contains('@');
        Ok(Visited {
            response: Some(json!({ "verified": data.verified })),
            data,
            next_event: "INTERNAL_Review".to_string(),
        })
    }

    fn revisit(&self, _: &str, data: &OnboardingData) -> FsmResult<Revisited<OnboardingData>> {
        Ok(Revisited {
            response: Some(json!({ "verified": data.verified })),
            data: data.clone(),
        })
    }
}

struct Review;

impl Review {
    fn summary(data: &OnboardingData) -> Value {
        json!({
            "name": data.name,
            "email": data.email,
            "verified": data.verified,
        })
    }
}

impl StateHandler<OnboardingData> for Review {
    fn visit(&self, _: &str, data: &OnboardingData, _: Option<Value>) -> FsmResult<Visited<OnboardingData>> {
        done(Self::summary(data), data.clone())
    }

    fn revisit(&self, _: &str, data: &OnboardingData) -> FsmResult<Revisited<OnboardingData>> {
        Ok(Revisited {
            response: Some(Self::summary(data)),
            data: data.clone(),
        })
    }
}

struct Done;

impl StateHandler<OnboardingData> for Done {
    fn visit(&self, _: &str, data: &OnboardingData, _: Option<Value>) -> FsmResult<Visited<OnboardingData>> {
        if !data.verified {
            return Err(FsmError::bypass("email has not been verified"));
        }
        let mut data = data.clone();
        data.completed = true;
        done(json!({ "status": "complete" }), data)
    }

    fn revisit(&self, _: &str, data: &OnboardingData) -> FsmResult<Revisited<OnboardingData>> {
        Ok(Revisited {
            response: Some(json!({ "status": "complete" })),
            data: data.clone(),
        })
    }
}

pub fn graph() -> Result<Graph<OnboardingData>, GraphError> {
    Graph::build_strict(
        State::new("Welcome", Arc::new(Welcome))
            .on("Next", "Profile")
            .checkpoint()
            .with_next_screen("WelcomeScreen"),
        vec![
            State::new("Profile", Arc::new(Profile))
                .on("INTERNAL_Verify", "Verify")
                .on(BACK_EVENT, "Welcome")
                .with_next_screen("ProfileScreen"),
            State::new("Verify", Arc::new(Verify)).on("INTERNAL_Review", "Review"),
            State::new("Review", Arc::new(Review))
                .on("Confirm", "Done")
                .on(BACK_EVENT, "Profile")
                .checkpoint()
                .with_next_screen("ReviewScreen")
                .with_meta_data(json!({ "step": 3, "of": 4 })),
            State::new("Done", Arc::new(Done)).with_next_screen("DoneScreen"),
        ],
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use waypoint_cache::LocalStore;
    use waypoint_journey::{FsmRequest, JourneyEngine, JourneyStore, KeyValueJourneyStore};

    type Store = KeyValueJourneyStore<OnboardingData, LocalStore>;

    fn engine() -> (JourneyEngine<OnboardingData>, Arc<Store>) {
        let store: Arc<Store> = Arc::new(KeyValueJourneyStore::new(LocalStore::new(60)));
        (JourneyEngine::new(graph().unwrap(), store.clone()), store)
    }

    #[test]
    fn test_happy_path() {
        let (engine, store) = engine();

        let welcome = engine
            .execute(FsmRequest::start(Some(json!({"name": "Ada"}))))
            .unwrap();
        assert_eq!(welcome.data, Some(json!({"greeting": "Welcome, Ada"})));
        let jid = welcome.journey_id.clone();

        let review = engine
            .execute(FsmRequest::event(&jid, "Next", Some(json!({"email": "ada@example.com"}))))
            .unwrap();
        assert_eq!(review.next_screen.as_deref(), Some("ReviewScreen"));
        assert_eq!(review.meta_data, Some(json!({"step": 3, "of": 4})));
        assert_eq!(review.data.as_ref().unwrap()["verified"], json!(true));

        let journey = store.get(&jid).unwrap();
        assert_eq!(journey.current_stage, "Review");
        assert_eq!(journey.last_checkpoint_stage, "Review");

        let finished = engine.execute(FsmRequest::event(&jid, "Confirm", None)).unwrap();
        assert_eq!(finished.next_screen.as_deref(), Some("DoneScreen"));
        assert!(store.get(&jid).unwrap().data.completed);
    }

    #[test]
    fn test_back_from_review_shows_profile() {
        let (engine, store) = engine();
        let jid = engine.execute(FsmRequest::start(None)).unwrap().journey_id;
        engine
            .execute(FsmRequest::event(&jid, "Next", Some(json!({"email": "bad-address"}))))
            .unwrap();

        let profile = engine.execute(FsmRequest::back(&jid)).unwrap();

        assert_eq!(profile.next_screen.as_deref(), Some("ProfileScreen"));
        assert_eq!(profile.data, Some(json!({"email": "bad-address"})));
        let journey = store.get(&jid).unwrap();
        assert_eq!(journey.current_stage, "Profile");
        assert_eq!(journey.last_checkpoint_stage, "Review");
    }

    #[test]
    fn test_unverified_email_cannot_confirm() {
        let (engine, _) = engine();
        let jid = engine.execute(FsmRequest::start(None)).unwrap().journey_id;
        engine
            .execute(FsmRequest::event(&jid, "Next", Some(json!({"email": "bad-address"}))))
            .unwrap();

        let err = engine.execute(FsmRequest::event(&jid, "Confirm", None)).unwrap_err();
        assert_eq!(err, FsmError::bypass("email has not been verified"));
    }

    #[test]
    fn test_missing_email_keeps_journey_on_welcome() {
        let (engine, store) = engine();
        let jid = engine.execute(FsmRequest::start(None)).unwrap().journey_id;

        let err = engine.execute(FsmRequest::event(&jid, "Next", None)).unwrap_err();
        assert_eq!(err, FsmError::bad_request("email is required"));
        assert_eq!(store.get(&jid).unwrap().current_stage, "Welcome");

        let resumed = engine.execute(FsmRequest::resume(&jid)).unwrap();
        assert_eq!(resumed.next_screen.as_deref(), Some("WelcomeScreen"));
    }
}
