use crate::domain::{Item, ItemId};
use crate::ports::catalog::{Catalog as CatalogTrait, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Catalogのモック実装
///
/// 在庫数の確認と更新は1つのロックの中で行うため、
/// 条件付き減算・加算はアトミックになる。
pub struct Catalog {
    items: Mutex<HashMap<ItemId, Item>>,
    fail_increments: AtomicBool,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            fail_increments: AtomicBool::new(false),
        }
    }

    /// テスト用に全冊在庫の資料を登録
    pub fn add_item(&self, item_id: ItemId, total_copies: u32) {
        self.items.lock().unwrap().insert(
            item_id,
            Item {
                id: item_id,
                available_copies: total_copies,
                total_copies,
            },
        );
    }

    /// 在庫 `total_copies` 冊の資料を新規登録してIDを返す
    pub fn add_new_item(&self, total_copies: u32) -> ItemId {
        let item_id = ItemId::new();
        self.add_item(item_id, total_copies);
        item_id
    }

    /// 在庫数を直接設定する（不整合の再現用）
    pub fn set_available(&self, item_id: ItemId, available_copies: u32) {
        if let Some(item) = self.items.lock().unwrap().get_mut(&item_id) {
            item.available_copies = available_copies;
        }
    }

    /// `true` の間、increment はエラーを返す
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    pub fn available_copies(&self, item_id: ItemId) -> Option<u32> {
        self.items
            .lock()
            .unwrap()
            .get(&item_id)
            .map(|item| item.available_copies)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogTrait for Catalog {
    async fn get(&self, item_id: ItemId) -> Result<Option<Item>> {
        Ok(self.items.lock().unwrap().get(&item_id).cloned())
    }

    async fn try_decrement(&self, item_id: ItemId) -> Result<bool> {
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&item_id) {
            Some(item) if item.available_copies > 0 => {
                item.available_copies -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment(&self, item_id: ItemId) -> Result<bool> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err("catalog unavailable".into());
        }

        let mut items = self.items.lock().unwrap();
        match items.get_mut(&item_id) {
            Some(item) if item.available_copies < item.total_copies => {
                item.available_copies += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_try_decrement_stops_at_zero() {
        let catalog = Catalog::new();
        let item_id = catalog.add_new_item(1);

        assert!(catalog.try_decrement(item_id).await.unwrap());
        assert!(!catalog.try_decrement(item_id).await.unwrap());
        assert_eq!(catalog.available_copies(item_id), Some(0));
    }

    #[tokio::test]
    async fn test_increment_stops_at_total() {
        let catalog = Catalog::new();
        let item_id = catalog.add_new_item(2);

        assert!(!catalog.increment(item_id).await.unwrap());
        assert!(catalog.try_decrement(item_id).await.unwrap());
        assert!(catalog.increment(item_id).await.unwrap());
        assert_eq!(catalog.available_copies(item_id), Some(2));
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let catalog = Catalog::new();
        let item_id = ItemId::new();

        assert!(catalog.get(item_id).await.unwrap().is_none());
        assert!(!catalog.try_decrement(item_id).await.unwrap());
        assert!(!catalog.increment(item_id).await.unwrap());
    }
}
