//! UseCase errors.
//!
//! Recoverable failures (auth, permission) have already been answered with an
//! `error` message to the connection by the time the caller sees them.

use thiserror::Error;

use crate::domain::{AuthError, ConnectionId, DeliveryError, PermissionError};

/// Failure of [`Hub::register`](super::Hub::register)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Failure of [`Hub::authenticate`](super::Hub::authenticate)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticateError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error("Invalid token")]
    Rejected(#[source] AuthError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Failure of [`Hub::broadcast`](super::Hub::broadcast)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error(transparent)]
    Permission(#[from] PermissionError),
}
