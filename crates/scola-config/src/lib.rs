//! scola-config
//!
//! Persistent operator preferences for the school ledger.
//! Owns the Config data structure plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{CascadeSettings, Config, ProjectionSettings};
