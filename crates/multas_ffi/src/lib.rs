//! Flutter-facing bindings for the fine scoreboard core.

pub mod api;
