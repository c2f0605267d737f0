//! InMemory HistoryStore 実装
//!
//! ドメイン層が定義する HistoryStore trait の具体的な実装。
//! ルームごとに `VecDeque` を持ち、保持件数を超えた分は古い順に破棄します
//! （ストレージ側でのトリミング）。

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{HistoryEntry, HistoryError, HistoryStore, RoomName};

/// Default number of entries kept per room
pub const DEFAULT_RETENTION: usize = 20;

/// インメモリ HistoryStore 実装
pub struct InMemoryHistoryStore {
    /// ルーム名 → タイムスタンプ順に並んだエントリ
    rooms: Mutex<HashMap<RoomName, VecDeque<HistoryEntry>>>,
    /// ルームごとの最大保持件数
    retention: usize,
}

impl InMemoryHistoryStore {
    /// 新しい InMemoryHistoryStore を作成
    pub fn new(retention: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            retention,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// ルームに保持されている件数
    pub async fn len(&self, room: &RoomName) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.get(room).map_or(0, VecDeque::len)
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut rooms = self.rooms.lock().await;
        let entries = rooms.entry(entry.room.clone()).or_default();

        // Keep entries sorted by timestamp; appends are almost always in order.
        let position = entries
            .iter()
            .rposition(|existing| existing.timestamp <= entry.timestamp)
            .map_or(0, |index| index + 1);
        entries.insert(position, entry);

        while entries.len() > self.retention {
            entries.pop_front();
        }
        Ok(())
    }

    async fn recent(
        &self,
        room: &RoomName,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let rooms = self.rooms.lock().await;
        let Some(entries) = rooms.get(room) else {
            return Ok(Vec::new());
        };

        let skip = entries.len().saturating_sub(limit);
        Ok(entries.iter().skip(skip).cloned().collect())
    }
}
