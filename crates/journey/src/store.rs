//! Journey record persistence.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;
use waypoint_core::{FsmError, FsmResult, KeyValueStore};

use crate::types::Journey;

/// Default key prefix of journey records.
pub const DEFAULT_KEY_PREFIX: &str = "FSM_JOURNEY_";

/// Source of fresh journey ids.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Random UUID v4 ids.
pub fn uuid_generator() -> IdGenerator {
    Arc::new(|| Uuid::new_v4().to_string())
}

/// Durable journey records keyed by journey id.
///
/// `get` must report a missing journey as [`FsmError::NotFound`].
pub trait JourneyStore<T>: Send + Sync {
    /// Allocates and persists a journey that has not visited any state.
    fn create(&self) -> FsmResult<Journey<T>>;
    fn get(&self, id: &str) -> FsmResult<Journey<T>>;
    fn save(&self, journey: &Journey<T>) -> FsmResult<()>;
    fn delete(&self, id: &str) -> FsmResult<()>;
}

/// [`JourneyStore`] over any [`KeyValueStore`], one JSON document per journey.
pub struct KeyValueJourneyStore<T, K> {
    kv: K,
    key_prefix: String,
    id_generator: IdGenerator,
    _data: PhantomData<fn() -> T>,
}

impl<T, K: KeyValueStore> KeyValueJourneyStore<T, K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            id_generator: uuid_generator(),
            _data: PhantomData,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_id_generator(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }
}

impl<T, K> KeyValueJourneyStore<T, K>
where
    T: Serialize + DeserializeOwned + Default,
    K: KeyValueStore,
{
    fn write(&self, journey: &Journey<T>) -> FsmResult<()> {
        let json = serde_json::to_string(journey)?;
        self.kv
            .set(&self.key(&journey.id), json)
            .map_err(|e| FsmError::internal(e.to_string()))
    }
}

impl<T, K> JourneyStore<T> for KeyValueJourneyStore<T, K>
where
    T: Serialize + DeserializeOwned + Default,
    K: KeyValueStore,
{
    fn create(&self) -> FsmResult<Journey<T>> {
        let journey = Journey::new((self.id_generator)());
        self.write(&journey)?;
        debug!(journey_id = %journey.id, "Created journey record");
        Ok(journey)
    }

    fn get(&self, id: &str) -> FsmResult<Journey<T>> {
        let json = self
            .kv
            .get(&self.key(id))
            .map_err(|e| FsmError::internal(e.to_string()))?
            .ok_or_else(|| FsmError::not_found("journey not found"))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, journey: &Journey<T>) -> FsmResult<()> {
        self.write(journey)
    }

    fn delete(&self, id: &str) -> FsmResult<()> {
        self.kv
            .del(&self.key(id))
            .map_err(|e| FsmError::internal(e.to_string()))
    }
}
