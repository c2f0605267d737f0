//! Infrastructure layer: concrete AuthGate and HistoryStore implementations
//! and the wire DTOs.

pub mod auth;
pub mod dto;
pub mod history;
