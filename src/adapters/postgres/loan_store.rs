use crate::domain::{ItemId, Loan, LoanId, LoanStatus, Money, NewLoan, PatronId};
use crate::ports::loan_store::{LoanStore as LoanStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

const LOAN_COLUMNS: &str = r#"
    id,
    patron_id,
    item_id,
    borrowed_at,
    due_at,
    returned_at,
    status,
    fine_amount,
    fine_paid,
    notes,
    created_at,
    updated_at
"#;

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// PostgreSQLの行データをLoanに変換する
///
/// status の文字列からの変換でエラーハンドリングを行う。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let status_str: &str = row.get("status");
    let status = LoanStatus::from_str(status_str).map_err(invalid_data)?;

    let fine_amount: Option<i64> = row.get("fine_amount");

    Ok(Loan {
        id: LoanId::from_uuid(row.get("id")),
        patron_id: PatronId::from_uuid(row.get("patron_id")),
        item_id: ItemId::from_uuid(row.get("item_id")),
        borrowed_at: row.get("borrowed_at"),
        due_at: row.get("due_at"),
        returned_at: row.get("returned_at"),
        status,
        fine_amount: fine_amount.map(Money::from_minor_units),
        fine_paid: row.get("fine_paid"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// 遷移元となりうる状態を文字列の配列にする（`status = ANY($n)` 用）
fn predecessor_strings(next: LoanStatus) -> Vec<String> {
    LoanStatus::predecessors_of(next)
        .into_iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

/// LoanStoreのPostgreSQL実装
///
/// 更新系はすべて `UPDATE ... WHERE <現在の状態>` の1文で行い、
/// 影響行数で条件の成否を判定する。
pub struct LoanStore {
    pool: PgPool,
}

impl LoanStore {
    /// PostgreSQLコネクションプールから新しいLoanStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_loans(&self, sql: &str, bind: Option<uuid::Uuid>) -> Result<Vec<Loan>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_loan).collect()
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn create(&self, new_loan: NewLoan) -> Result<Loan> {
        let sql = format!(
            r#"
            INSERT INTO loans (
                id,
                patron_id,
                item_id,
                borrowed_at,
                due_at,
                status,
                notes
            )
            VALUES ($1, $2, $3, $4, $5, 'borrowed', $6)
            RETURNING {LOAN_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(LoanId::new().value())
            .bind(new_loan.patron_id.value())
            .bind(new_loan.item_id.value())
            .bind(new_loan.borrowed_at)
            .bind(new_loan.due_at)
            .bind(new_loan.notes)
            .fetch_one(&self.pool)
            .await?;

        map_row_to_loan(&row)
    }

    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// 利用者の全貸出（新しい順）
    async fn find_by_patron(&self, patron_id: PatronId) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE patron_id = $1 ORDER BY borrowed_at DESC, created_at DESC"
        );
        self.fetch_loans(&sql, Some(patron_id.value())).await
    }

    async fn find_by_item(&self, item_id: ItemId) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE item_id = $1 ORDER BY borrowed_at DESC, created_at DESC"
        );
        self.fetch_loans(&sql, Some(item_id.value())).await
    }

    async fn find_open(&self) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE returned_at IS NULL ORDER BY borrowed_at DESC"
        );
        self.fetch_loans(&sql, None).await
    }

    /// 延滞候補（部分インデックス loans_open_due_at_idx を使用）
    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let sql = format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE returned_at IS NULL
              AND status <> 'lost'
              AND due_at < $1
            ORDER BY due_at ASC
            "#
        );
        let rows = sqlx::query(&sql).bind(now).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn mark_returned(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET returned_at = $2,
                status = 'returned',
                updated_at = NOW()
            WHERE id = $1
              AND returned_at IS NULL
              AND status = ANY($3)
            "#,
        )
        .bind(loan_id.value())
        .bind(returned_at)
        .bind(predecessor_strings(LoanStatus::Returned))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returned への遷移は mark_returned でのみ行う
    async fn set_status(&self, loan_id: LoanId, status: LoanStatus) -> Result<bool> {
        if status == LoanStatus::Returned {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
              AND returned_at IS NULL
              AND status = ANY($3)
            "#,
        )
        .bind(loan_id.value())
        .bind(status.as_str())
        .bind(predecessor_strings(status))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_fine(&self, loan_id: LoanId, amount: Money) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET fine_amount = $2,
                updated_at = NOW()
            WHERE id = $1
              AND returned_at IS NULL
              AND (fine_amount IS NULL OR fine_amount <= $2)
            "#,
        )
        .bind(loan_id.value())
        .bind(amount.minor_units())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 部分インデックス loans_open_patron_idx を使用
    async fn count_open_by_patron(&self, patron_id: PatronId) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE patron_id = $1 AND returned_at IS NULL",
        )
        .bind(patron_id.value())
        .fetch_one(&self.pool)
        .await?;

        usize::try_from(count).map_err(|_| invalid_data(format!("negative count: {}", count)))
    }
}
