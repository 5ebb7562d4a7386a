//! Scoreboard domain model.
//!
//! # Responsibility
//! - Define the person record tracked by the board.
//! - Define pure fine and total calculations over person counters.
//!
//! # Invariants
//! - Every person is identified by a store-assigned `PersonId`.
//! - Fines are derived from counters on every read and never stored.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod fines;
pub mod person;
