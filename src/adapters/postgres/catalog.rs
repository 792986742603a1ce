use crate::domain::{Item, ItemId};
use crate::ports::catalog::{Catalog as CatalogTrait, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// CatalogのPostgreSQL実装
///
/// 在庫数は条件付きの UPDATE 1文で変更するため、
/// 0 を下回ることも `total_copies` を超えることもない。
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_copies(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} out of range: {}", column, value),
        )) as Box<dyn std::error::Error + Send + Sync>
    })
}

#[async_trait]
impl CatalogTrait for Catalog {
    async fn get(&self, item_id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT id, available_copies, total_copies
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(item_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Item {
                id: ItemId::from_uuid(row.get("id")),
                available_copies: to_copies(row.get("available_copies"), "available_copies")?,
                total_copies: to_copies(row.get("total_copies"), "total_copies")?,
            })
        })
        .transpose()
    }

    async fn try_decrement(&self, item_id: ItemId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET available_copies = available_copies - 1,
                updated_at = NOW()
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(item_id.value())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment(&self, item_id: ItemId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET available_copies = available_copies + 1,
                updated_at = NOW()
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(item_id.value())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
