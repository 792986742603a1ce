use crate::domain::{Patron, PatronId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 利用者ディレクトリポート
///
/// 貸出コンテキストと利用者管理の境界を維持する。
/// 貸出コンテキストは利用者のIDと状態のみを知る。
#[async_trait]
pub trait PatronDirectory: Send + Sync {
    /// IDで利用者を取得する
    async fn get(&self, patron_id: PatronId) -> Result<Option<Patron>>;
}
