//! Conversion logic between DTOs and domain entities.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    Command, DecodeError, Message, MessageContent, MessageKind, RoomName,
};
use crate::infrastructure::dto::{http, websocket as dto};
use crate::usecase::RoomSnapshot;

// ========================================
// DTO → Domain
// ========================================

/// Decode one inbound text frame into a [`Command`].
pub fn decode_command(text: &str) -> Result<Command, DecodeError> {
    let wire = serde_json::from_str::<dto::WireMessage>(text)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Command::try_from(wire)
}

impl TryFrom<dto::WireMessage> for Command {
    type Error = DecodeError;

    fn try_from(wire: dto::WireMessage) -> Result<Self, Self::Error> {
        match wire.r#type {
            dto::MessageType::Authenticate => Ok(Command::Authenticate {
                token: wire.content.trim().to_string(),
            }),
            dto::MessageType::Join => {
                // `room` wins; `content` is accepted as the room name as well
                let name = match wire.room {
                    Some(room) if !room.is_empty() => room,
                    _ => wire.content,
                };
                Ok(Command::Join {
                    room: RoomName::new(name)?,
                })
            }
            dto::MessageType::Chat => {
                if wire.content.is_empty() {
                    return Ok(Command::Empty);
                }
                let room = wire
                    .room
                    .filter(|room| !room.is_empty())
                    .map(RoomName::new)
                    .transpose()?;
                Ok(Command::Chat {
                    room,
                    content: MessageContent::new(wire.content)?,
                })
            }
            other @ (dto::MessageType::AuthResult
            | dto::MessageType::Error
            | dto::MessageType::System) => {
                Err(DecodeError::UnsupportedType(other.as_str().to_string()))
            }
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<MessageKind> for dto::MessageType {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Chat => Self::Chat,
            MessageKind::Join => Self::Join,
            MessageKind::AuthResult => Self::AuthResult,
            MessageKind::Error => Self::Error,
            MessageKind::System => Self::System,
        }
    }
}

impl From<Message> for dto::WireMessage {
    fn from(message: Message) -> Self {
        Self {
            r#type: message.kind.into(),
            sender: message.sender.map(|identity| identity.into_string()),
            room: message.room.map(RoomName::into_string),
            content: message.content,
            timestamp: Some(timestamp_to_rfc3339(message.timestamp.value())),
        }
    }
}

/// Serialize an outbound message into the text of one frame.
pub fn encode_message(message: Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(&dto::WireMessage::from(message))
}

impl From<RoomSnapshot> for http::RoomDetailDto {
    fn from(snapshot: RoomSnapshot) -> Self {
        Self {
            name: snapshot.name.into_string(),
            public: snapshot.public,
            members: snapshot
                .members
                .into_iter()
                .map(|(connection_id, identity)| http::MemberDto {
                    connection_id: connection_id.to_string(),
                    identity: identity.map(|identity| identity.into_string()),
                })
                .collect(),
        }
    }
}
