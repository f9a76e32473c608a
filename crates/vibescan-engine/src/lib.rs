//! vibescan-engine — runs scans on a dedicated thread.
//!
//! Owns the detector, the frame source and the persistent store, and serves
//! scan and summary requests over a bounded channel.

pub mod config;
pub mod engine;
pub mod sqlite_store;

pub use config::{Config, ConfigError};
pub use engine::{spawn_engine, EngineError, EngineHandle, Summary};
pub use sqlite_store::SqliteStore;
