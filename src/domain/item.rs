use serde::{Deserialize, Serialize};

use super::ItemId;

/// 資料 - 貸出コンテキストが知るのは在庫数のみ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub available_copies: u32,
    pub total_copies: u32,
}

impl Item {
    pub fn has_available_copy(&self) -> bool {
        self.available_copies > 0
    }
}
