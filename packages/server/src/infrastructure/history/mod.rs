//! チャット履歴ストアの実装
//!
//! ## 実装
//!
//! - `inmemory`: ルームごとの有界リングバッファ
//! - 将来的に: `sqlite` など

pub mod inmemory;

pub use inmemory::InMemoryHistoryStore;
