#![forbid(unsafe_code)]

pub mod sqlite;
pub mod store;

pub use store::{InMemoryStore, KeyValueStore, SessionStore, StoreError};
