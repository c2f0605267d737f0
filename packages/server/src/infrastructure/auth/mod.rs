//! AuthGate の実装
//!
//! - `jwt`: HS256 署名付きクレーム（有効期限付き）
//! - `static_table`: トークン → 名前のルックアップテーブル

pub mod jwt;
pub mod static_table;

pub use jwt::JwtAuthGate;
pub use static_table::StaticTokenAuthGate;
