//! HistoryStore trait 定義
//!
//! ドメイン層が必要とするチャット履歴へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{HistoryEntry, HistoryError, RoomName};

/// ルームごとの append-only なメッセージ履歴
///
/// ブロードキャストからの `append` と、join / 認証時の再生からの `recent` が
/// 同時に呼ばれても安全でなければなりません。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// エントリを `entry.room` の履歴に追加する
    ///
    /// 保持件数を超えた場合は古いものから破棄される。
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;

    /// 最新 `limit` 件を古い順に返す
    async fn recent(
        &self,
        room: &RoomName,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, HistoryError>;
}
