//! Room-based WebSocket chat fan-out server.
//!
//! A [`usecase::Hub`] owns the room table and dispatches every message; each
//! WebSocket connection is serviced by a receive loop and a send loop sharing
//! one bounded outbound queue (see [`ui`]).

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
