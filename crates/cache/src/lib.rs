#![warn(clippy::unwrap_used)]

pub mod client;
pub mod local;

pub use client::RedisStore;
pub use local::LocalStore;
