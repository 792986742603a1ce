use crate::domain::{Patron, PatronId, PatronStatus};
use crate::ports::patron_directory::{PatronDirectory as PatronDirectoryTrait, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

/// PatronDirectoryのPostgreSQL実装
///
/// 利用者テーブルは利用者管理が所有する。ここでは読み取りのみ行う。
pub struct PatronDirectory {
    pool: PgPool,
}

impl PatronDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatronDirectoryTrait for PatronDirectory {
    async fn get(&self, patron_id: PatronId) -> Result<Option<Patron>> {
        let row = sqlx::query("SELECT id, status FROM patrons WHERE id = $1")
            .bind(patron_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let status_str: &str = row.get("status");
            let status = PatronStatus::from_str(status_str).map_err(|e| {
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                    as Box<dyn std::error::Error + Send + Sync>
            })?;

            Ok(Patron {
                id: PatronId::from_uuid(row.get("id")),
                status,
            })
        })
        .transpose()
    }
}
