//! Entity 定義
//!
//! - `Message`: 接続へ送られる 1 件のメッセージ
//! - `HistoryEntry`: 永続化されるチャット履歴の 1 件
//! - `Command`: 受信フレームをデコードした結果

use super::value_object::{Identity, MessageContent, RoomName, Timestamp};

/// メッセージ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Join,
    AuthResult,
    Error,
    System,
}

/// 接続の outbound queue に積まれるメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub sender: Option<Identity>,
    pub room: Option<RoomName>,
    pub content: String,
    pub timestamp: Timestamp,
}

impl Message {
    /// ルームへブロードキャストされるチャットメッセージ
    pub fn chat(
        sender: Option<Identity>,
        room: RoomName,
        content: &MessageContent,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            kind: MessageKind::Chat,
            sender,
            room: Some(room),
            content: content.as_str().to_string(),
            timestamp,
        }
    }

    /// ルーム参加の確認応答
    pub fn join_ack(room: RoomName, timestamp: Timestamp) -> Self {
        Self {
            kind: MessageKind::Join,
            sender: None,
            content: format!("Welcome to room: {}", room),
            room: Some(room),
            timestamp,
        }
    }

    /// 認証成功の通知
    pub fn auth_success(identity: Identity, timestamp: Timestamp) -> Self {
        Self {
            kind: MessageKind::AuthResult,
            sender: Some(identity),
            room: None,
            content: "Authenticated!".to_string(),
            timestamp,
        }
    }

    pub fn error(content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            kind: MessageKind::Error,
            sender: None,
            room: None,
            content: content.into(),
            timestamp,
        }
    }

    pub fn system(content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            kind: MessageKind::System,
            sender: None,
            room: None,
            content: content.into(),
            timestamp,
        }
    }
}

/// チャット履歴の 1 件（append-only、生成後は変更されない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub room: RoomName,
    pub sender: Option<Identity>,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    pub fn new(
        room: RoomName,
        sender: Option<Identity>,
        content: MessageContent,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            room,
            sender,
            content,
            timestamp,
        }
    }
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        Message::chat(entry.sender, entry.room, &entry.content, entry.timestamp)
    }
}

/// 受信フレームから得られる制御/チャット要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Authenticate { token: String },
    Join { room: RoomName },
    /// `room` が `None` の場合は接続のホームルーム宛て
    Chat {
        room: Option<RoomName>,
        content: MessageContent,
    },
    /// 本文が空のチャット（黙って無視される）
    Empty,
}
