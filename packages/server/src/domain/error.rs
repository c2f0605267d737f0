//! Domain errors.
//!
//! Every variant whose `Display` reaches a client is phrased as the text of the
//! `error` message that client receives.

use thiserror::Error;

use super::value_object::{ConnectionId, RoomName};

/// Validation failures when constructing value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Room name must not be empty")]
    EmptyRoomName,

    #[error("Room name is too long (max {max} characters)")]
    RoomNameTooLong { max: usize },

    #[error("Room name must not contain control characters")]
    InvalidRoomName,

    #[error("Identity must not be empty")]
    EmptyIdentity,

    #[error("Identity is too long (max {max} characters)")]
    IdentityTooLong { max: usize },

    #[error("Message content must not be empty")]
    EmptyMessageContent,

    #[error("Message is too long (max {max} characters)")]
    MessageContentTooLong { max: usize },
}

/// A malformed inbound frame. Recoverable: the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(
        "Invalid JSON format. Please send a JSON object like {{\"type\":\"chat\", \"content\":\"Hello\"}}."
    )]
    Malformed(String),

    #[error("Unsupported message type '{0}'")]
    UnsupportedType(String),

    #[error("Binary frames are not supported")]
    BinaryFrame,

    #[error(transparent)]
    InvalidField(#[from] ValueObjectError),
}

/// Token rejection reported by an [`AuthGate`](super::AuthGate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,

    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token is missing claim '{0}'")]
    MissingClaim(&'static str),

    #[error("unknown token")]
    UnknownToken,
}

/// Access to a restricted room without a bound identity, or to a room the
/// connection is not a member of.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("Auth required")]
    AuthRequired { room: RoomName },

    #[error("You are not in this room")]
    NotAMember { room: RoomName },
}

/// Outcome of a non-blocking enqueue onto a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient is unresponsive and gets evicted.
    #[error("outbound queue of connection {0} is full")]
    QueueFull(ConnectionId),

    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// Failure of the history store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}
