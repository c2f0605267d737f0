//! Domain layer for the chat server.
//!
//! This module contains business rules that are independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod auth;
pub mod entity;
pub mod error;
pub mod history;
pub mod membership;
pub mod value_object;

pub use auth::AuthGate;
pub use entity::{Command, HistoryEntry, Message, MessageKind};
pub use error::{
    AuthError, DecodeError, DeliveryError, HistoryError, PermissionError, ValueObjectError,
};
pub use history::HistoryStore;
pub use membership::Membership;
pub use value_object::{ConnectionId, Identity, MessageContent, RoomName, Timestamp};
