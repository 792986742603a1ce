use crate::domain::{Patron, PatronId, PatronStatus};
use crate::ports::patron_directory::{PatronDirectory as PatronDirectoryTrait, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// PatronDirectoryのモック実装
///
/// 利用者を登録して状態を持ったテストをサポートする。
pub struct PatronDirectory {
    patrons: Mutex<HashMap<PatronId, Patron>>,
}

impl PatronDirectory {
    pub fn new() -> Self {
        Self {
            patrons: Mutex::new(HashMap::new()),
        }
    }

    /// テスト用に利用者を登録（既存なら状態を上書き）
    pub fn add_patron(&self, patron_id: PatronId, status: PatronStatus) {
        self.patrons.lock().unwrap().insert(
            patron_id,
            Patron {
                id: patron_id,
                status,
            },
        );
    }

    /// 有効な利用者を新規登録してIDを返す
    pub fn add_active_patron(&self) -> PatronId {
        let patron_id = PatronId::new();
        self.add_patron(patron_id, PatronStatus::Active);
        patron_id
    }
}

impl Default for PatronDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatronDirectoryTrait for PatronDirectory {
    async fn get(&self, patron_id: PatronId) -> Result<Option<Patron>> {
        Ok(self.patrons.lock().unwrap().get(&patron_id).cloned())
    }
}
