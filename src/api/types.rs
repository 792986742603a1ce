use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::loan::{ReconciliationReport, ReturnReceipt};
use crate::domain::{Loan, LoanStatus};

/// 貸出リクエスト（POST /loans）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub patron_id: Uuid,
    pub item_id: Uuid,
    /// 省略時はポリシーの既定の貸出期間
    pub loan_period_days: Option<i64>,
}

/// 利用者の貸出一覧のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct PatronLoansQuery {
    #[serde(default)]
    pub open_only: bool,
}

/// 貸出可否のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    pub patron_id: Uuid,
    pub item_id: Uuid,
}

/// 貸出レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub patron_id: Uuid,
    pub item_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub fine_amount: Option<i64>,
    pub fine_paid: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            loan_id: loan.id.value(),
            patron_id: loan.patron_id.value(),
            item_id: loan.item_id.value(),
            borrowed_at: loan.borrowed_at,
            due_at: loan.due_at,
            returned_at: loan.returned_at,
            status: loan.status,
            fine_amount: loan.fine_amount.map(|m| m.minor_units()),
            fine_paid: loan.fine_paid,
            notes: loan.notes,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

/// 返却レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnResponse {
    pub loan_id: Uuid,
    pub item_id: Uuid,
    pub returned_at: DateTime<Utc>,
    pub fine_amount: i64,
}

impl From<ReturnReceipt> for ReturnResponse {
    fn from(receipt: ReturnReceipt) -> Self {
        Self {
            loan_id: receipt.loan_id.value(),
            item_id: receipt.item_id.value(),
            returned_at: receipt.returned_at,
            fine_amount: receipt.fine.minor_units(),
        }
    }
}

/// 延滞料金レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineResponse {
    pub loan_id: Uuid,
    pub fine_amount: i64,
}

/// 貸出可否レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
}

/// 照合で失敗した貸出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationFailureResponse {
    pub loan_id: Uuid,
    pub error: String,
}

/// 延滞照合レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResponse {
    pub examined: usize,
    pub marked_overdue: usize,
    pub fines_updated: usize,
    pub skipped: usize,
    pub failures: Vec<ReconciliationFailureResponse>,
}

impl From<ReconciliationReport> for ReconciliationResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            examined: report.examined,
            marked_overdue: report.marked_overdue,
            fines_updated: report.fines_updated,
            skipped: report.skipped,
            failures: report
                .failures
                .into_iter()
                .map(|f| ReconciliationFailureResponse {
                    loan_id: f.loan_id.value(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
