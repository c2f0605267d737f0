//! Shared application state.

use std::sync::Arc;

use crate::{config::PumpConfig, usecase::Hub};

/// State shared by every request handler
pub struct AppState {
    /// 接続・ルーム・履歴を管理する Hub
    pub hub: Arc<Hub>,
    /// 接続ごとの送受信ループの設定
    pub pump: PumpConfig,
}
