//! UseCase layer: the hub that owns the room table and dispatches messages.

pub mod error;
pub mod hub;

pub use error::{AuthenticateError, JoinError, SendMessageError};
pub use hub::{BroadcastReport, Hub, OutboundReceiver, RoomSnapshot};
