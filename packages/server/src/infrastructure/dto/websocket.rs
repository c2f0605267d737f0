//! WebSocket message DTOs.
//!
//! One JSON object per frame, in both directions.

use serde::{Deserialize, Serialize};

/// Message type discriminator (`"type"` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    #[serde(alias = "message")]
    Chat,
    Join,
    #[serde(alias = "auth")]
    Authenticate,
    AuthResult,
    Error,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Join => "join",
            Self::Authenticate => "authenticate",
            Self::AuthResult => "auth-result",
            Self::Error => "error",
            Self::System => "system",
        }
    }
}

/// Wire message
///
/// Inbound frames may omit everything except `type`; outbound frames always
/// carry a `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub r#type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default)]
    pub content: String,
    /// RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
