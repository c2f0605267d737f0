//! AuthGate trait 定義
//!
//! ベアラートークンを検証し、成功すれば `Identity` を返します。
//! 具体的な検証方式（署名付きクレーム、ルックアップテーブル等）は
//! Infrastructure 層が提供します。

use super::{AuthError, Identity};

/// ステートレスなトークン検証器
///
/// 副作用を持たず、複数の接続から同時に呼び出しても安全でなければなりません。
/// 検証の失敗は常に回復可能な拒否として扱われます（接続はゲストのまま）。
#[cfg_attr(test, mockall::automock)]
pub trait AuthGate: Send + Sync {
    /// トークンを検証する
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
