use crate::domain::{Item, ItemId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// カタログポート
///
/// 資料の在庫数を管理する外部コンテキストとの境界。
/// 在庫数は必ずこのポートの条件付き更新で変更し、
/// 読んでから書く操作をしてはならない。
#[async_trait]
pub trait Catalog: Send + Sync {
    /// IDで資料を取得する
    async fn get(&self, item_id: ItemId) -> Result<Option<Item>>;

    /// available_copies > 0 の場合のみ1減らす
    ///
    /// 資料が存在しない、または在庫が0の場合は `false`。
    async fn try_decrement(&self, item_id: ItemId) -> Result<bool>;

    /// available_copies < total_copies の場合のみ1増やす
    ///
    /// 資料が存在しない、または既に全冊在庫の場合は `false`。
    async fn increment(&self, item_id: ItemId) -> Result<bool>;
}
