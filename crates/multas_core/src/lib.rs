//! Core domain logic for the fine scoreboard.
//! This crate is the single source of truth for counter and reset invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod mirror;
pub mod model;
pub mod reset;
pub mod service;
pub mod store;

pub use config::{ConfigError, ScoreboardConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use mirror::LocalMirror;
pub use model::fines::{format_amount, FineRates};
pub use model::person::{Counter, Direction, Person, PersonId, PersonMappingError};
pub use reset::{InvalidTransition, ResetAction, ResetFlow, ResetState};
pub use service::scoreboard_service::{
    BoardRow, BoardSnapshot, ScoreboardError, ScoreboardResult, ScoreboardService,
};
pub use store::{
    Document, Fields, InMemoryRecordStore, RecordStore, SqliteRecordStore, StoreError, StoreFault,
    StoreResult, WriteBatch,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
