//! Value Object 定義
//!
//! 生成時にバリデーションを行い、不正な値が存在しないことを型で保証します。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

/// Name of the room every connection joins unless it asks for another one
pub const DEFAULT_PUBLIC_ROOM: &str = "public";

/// Maximum length of a room name (in characters)
pub const ROOM_NAME_MAX_LENGTH: usize = 64;

/// Maximum length of an identity name (in characters)
pub const IDENTITY_MAX_LENGTH: usize = 64;

/// Maximum length of a chat message (in characters)
pub const MESSAGE_CONTENT_MAX_LENGTH: usize = 4096;

/// 接続ごとに割り当てられる安定した識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい ConnectionId をランダムに生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ルーム名
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName(String);

impl RoomName {
    /// 新しい RoomName を作成
    ///
    /// 空文字・空白のみ・制御文字を含む名前、および長すぎる名前は拒否されます。
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyRoomName);
        }
        if value.chars().count() > ROOM_NAME_MAX_LENGTH {
            return Err(ValueObjectError::RoomNameTooLong {
                max: ROOM_NAME_MAX_LENGTH,
            });
        }
        if value.chars().any(char::is_control) {
            return Err(ValueObjectError::InvalidRoomName);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for RoomName {
    fn default() -> Self {
        Self(DEFAULT_PUBLIC_ROOM.to_string())
    }
}

impl TryFrom<String> for RoomName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 認証済みのプリンシパル
///
/// 接続に一度だけ束縛され、以後は変更されません。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        if name.trim().is_empty() {
            return Err(ValueObjectError::EmptyIdentity);
        }
        if name.chars().count() > IDENTITY_MAX_LENGTH {
            return Err(ValueObjectError::IdentityTooLong {
                max: IDENTITY_MAX_LENGTH,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャットメッセージ本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(content: String) -> Result<Self, ValueObjectError> {
        if content.is_empty() {
            return Err(ValueObjectError::EmptyMessageContent);
        }
        if content.chars().count() > MESSAGE_CONTENT_MAX_LENGTH {
            return Err(ValueObjectError::MessageContentTooLong {
                max: MESSAGE_CONTENT_MAX_LENGTH,
            });
        }
        Ok(Self(content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（ミリ秒、UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name_accepts_regular_name() {
        // テスト項目: 通常のルーム名は受け入れられる
        // given (前提条件):
        let value = "general".to_string();

        // when (操作):
        let result = RoomName::new(value);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "general");
    }

    #[test]
    fn test_room_name_rejects_blank() {
        // テスト項目: 空白のみのルーム名は拒否される
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = RoomName::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyRoomName));
    }

    #[test]
    fn test_room_name_rejects_too_long() {
        // テスト項目: 上限を超える長さのルーム名は拒否される
        // given (前提条件):
        let value = "r".repeat(ROOM_NAME_MAX_LENGTH + 1);

        // when (操作):
        let result = RoomName::new(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::RoomNameTooLong {
                max: ROOM_NAME_MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_room_name_rejects_control_characters() {
        // テスト項目: 制御文字を含むルーム名は拒否される
        // given (前提条件):
        let value = "gen\neral".to_string();

        // when (操作):
        let result = RoomName::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::InvalidRoomName));
    }

    #[test]
    fn test_identity_rejects_empty() {
        // テスト項目: 空の Identity は拒否される
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = Identity::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyIdentity));
    }

    #[test]
    fn test_message_content_rejects_empty() {
        // テスト項目: 空のメッセージ本文は拒否される
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = MessageContent::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyMessageContent));
    }

    #[test]
    fn test_message_content_boundary_length() {
        // テスト項目: 上限ちょうどの長さは受け入れ、超えると拒否される
        // given (前提条件):
        let at_limit = "a".repeat(MESSAGE_CONTENT_MAX_LENGTH);
        let over_limit = "a".repeat(MESSAGE_CONTENT_MAX_LENGTH + 1);

        // when (操作):
        let ok = MessageContent::new(at_limit);
        let err = MessageContent::new(over_limit);

        // then (期待する結果):
        assert!(ok.is_ok());
        assert_eq!(
            err,
            Err(ValueObjectError::MessageContentTooLong {
                max: MESSAGE_CONTENT_MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_connection_ids_are_unique() {
        // テスト項目: 生成される ConnectionId は重複しない
        // given (前提条件):

        // when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }
}
