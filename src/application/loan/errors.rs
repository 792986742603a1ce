use crate::domain::{ItemId, LoanId, LoanStatus, PatronId, PatronStatus, TransitionError};
use thiserror::Error;

/// エラーの分類
///
/// - NotFound / InvalidState: 呼び出し側で回復可能。コアは再試行しない
/// - Conflict: 並行更新に負けた。呼び出し側は前提条件の確認から再試行してよい
/// - Inconsistency: 2つの集約のうち片方だけが更新された。自動再試行せず運用で修復する
/// - Infrastructure: ストア・外部サービスのI/Oエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Conflict,
    Inconsistency,
    Infrastructure,
}

/// 集約をまたぐ更新の片側だけが成功した状態
#[derive(Debug, Error)]
pub enum Inconsistency {
    /// 在庫は減ったが貸出記録を作成できなかった
    #[error("copy of item {item_id} was taken for patron {patron_id} but no loan was recorded")]
    CopyTakenWithoutLoan {
        patron_id: PatronId,
        item_id: ItemId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 返却は記録されたが在庫を戻せなかった
    #[error("loan {loan_id} was returned but the copy of item {item_id} was not restored: {reason}")]
    ReturnedWithoutCopyRestored {
        loan_id: LoanId,
        item_id: ItemId,
        reason: String,
    },
}

/// 貸出アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LendingError {
    /// 利用者が存在しない
    #[error("Patron not found: {0}")]
    PatronNotFound(PatronId),

    /// 資料が存在しない
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// 貸出が存在しない
    #[error("Loan not found: {0}")]
    LoanNotFound(LoanId),

    /// 利用者が有効でない
    #[error("Patron {patron_id} is not active (status: {})", .status.as_str())]
    PatronNotActive {
        patron_id: PatronId,
        status: PatronStatus,
    },

    /// 貸出可能な在庫がない
    #[error("No copies of item {0} are available")]
    NoCopiesAvailable(ItemId),

    /// 貸出上限に達している
    #[error("Patron {patron_id} has reached the borrowing limit ({open_loans} of {limit})")]
    BorrowLimitReached {
        patron_id: PatronId,
        open_loans: usize,
        limit: usize,
    },

    /// 既に返却済み（並行する返却に負けた場合を含む）
    #[error("Loan {0} has already been returned")]
    AlreadyReturned(LoanId),

    /// 状態遷移が許されない
    #[error("Loan {loan_id}: {source}")]
    IllegalTransition {
        loan_id: LoanId,
        #[source]
        source: TransitionError,
    },

    /// 貸出期間が不正
    #[error("Invalid loan period: {0} days")]
    InvalidLoanPeriod(i64),

    /// 確認後、在庫の減算までの間に別の貸出が在庫を使い切った
    #[error("Copy count of item {0} changed concurrently; retry the borrow")]
    CopyCountConflict(ItemId),

    /// 状態が確認時から変わっていた
    #[error("Loan {loan_id} changed concurrently (expected {})", .expected.as_str())]
    LoanStateConflict {
        loan_id: LoanId,
        expected: LoanStatus,
    },

    /// 集約間の不整合（要手動修復）
    #[error("Inconsistency: {0}")]
    Inconsistency(#[from] Inconsistency),

    /// LoanStoreのエラー
    #[error("Loan store error")]
    LoanStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// PatronDirectoryのエラー
    #[error("Patron directory error")]
    PatronDirectoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Catalogのエラー
    #[error("Catalog error")]
    CatalogError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LendingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LendingError::PatronNotFound(_)
            | LendingError::ItemNotFound(_)
            | LendingError::LoanNotFound(_) => ErrorKind::NotFound,

            LendingError::PatronNotActive { .. }
            | LendingError::NoCopiesAvailable(_)
            | LendingError::BorrowLimitReached { .. }
            | LendingError::AlreadyReturned(_)
            | LendingError::IllegalTransition { .. }
            | LendingError::InvalidLoanPeriod(_) => ErrorKind::InvalidState,

            LendingError::CopyCountConflict(_) | LendingError::LoanStateConflict { .. } => {
                ErrorKind::Conflict
            }

            LendingError::Inconsistency(_) => ErrorKind::Inconsistency,

            LendingError::LoanStoreError(_)
            | LendingError::PatronDirectoryError(_)
            | LendingError::CatalogError(_) => ErrorKind::Infrastructure,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LendingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let loan_id = LoanId::new();
        let item_id = ItemId::new();

        assert_eq!(
            LendingError::LoanNotFound(loan_id).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LendingError::AlreadyReturned(loan_id).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            LendingError::CopyCountConflict(item_id).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LendingError::from(Inconsistency::ReturnedWithoutCopyRestored {
                loan_id,
                item_id,
                reason: "increment rejected".to_string(),
            })
            .kind(),
            ErrorKind::Inconsistency
        );
        assert_eq!(
            LendingError::CatalogError("boom".into()).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn test_patron_not_active_message() {
        let patron_id = PatronId::new();
        let err = LendingError::PatronNotActive {
            patron_id,
            status: PatronStatus::Suspended,
        };
        assert_eq!(
            err.to_string(),
            format!("Patron {} is not active (status: suspended)", patron_id)
        );
    }
}
