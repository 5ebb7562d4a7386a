//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store writes and local mirror updates.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod scoreboard_service;
