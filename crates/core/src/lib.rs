pub mod config;
pub mod error;
pub mod kv;

pub use config::AppConfig;
pub use error::{FsmError, FsmResult};
pub use kv::KeyValueStore;
