use crate::domain::{
    self, ItemId, LendingPolicy, Loan, LoanId, LoanStatus, Money, NewLoanError, PatronId,
    commands::*, fine,
};
use crate::ports::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::errors::{ErrorKind, Inconsistency, LendingError, Result};

/// サービスの依存関係
///
/// 振る舞いは持たず、各サービス関数に引数として渡す。
/// すべてのポートは `Send + Sync` であり、複数のタスクから同時に呼ばれてよい。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_store: Arc<dyn LoanStore>,
    pub patron_directory: Arc<dyn PatronDirectory>,
    pub catalog: Arc<dyn Catalog>,
    pub clock: Arc<dyn Clock>,
    pub policy: LendingPolicy,
}

/// 返却の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnReceipt {
    pub loan_id: LoanId,
    pub item_id: ItemId,
    pub returned_at: DateTime<Utc>,
    /// 返却時点で確定した延滞料金
    pub fine: Money,
}

/// 貸出を取得するヘルパー関数
///
/// 存在しない場合は `LoanNotFound`。
pub(super) async fn load_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.loan_store
        .find_by_id(loan_id)
        .await
        .map_err(LendingError::LoanStoreError)?
        .ok_or(LendingError::LoanNotFound(loan_id))
}

/// 貸出の前提条件を順に確認する
///
/// 1. 利用者が存在すること
/// 2. 利用者が有効であること
/// 3. 資料が存在すること
/// 4. 在庫が1冊以上あること
/// 5. 利用者の未返却の貸出が上限未満であること
///
/// 最初に失敗した条件のエラーを返す。副作用はない。
async fn check_borrow_preconditions(
    deps: &ServiceDependencies,
    patron_id: PatronId,
    item_id: ItemId,
) -> Result<()> {
    let patron = deps
        .patron_directory
        .get(patron_id)
        .await
        .map_err(LendingError::PatronDirectoryError)?
        .ok_or(LendingError::PatronNotFound(patron_id))?;

    if !patron.is_active() {
        return Err(LendingError::PatronNotActive {
            patron_id,
            status: patron.status,
        });
    }

    let item = deps
        .catalog
        .get(item_id)
        .await
        .map_err(LendingError::CatalogError)?
        .ok_or(LendingError::ItemNotFound(item_id))?;

    if !item.has_available_copy() {
        return Err(LendingError::NoCopiesAvailable(item_id));
    }

    let open_loans = deps
        .loan_store
        .count_open_by_patron(patron_id)
        .await
        .map_err(LendingError::LoanStoreError)?;

    if open_loans >= deps.policy.max_open_loans {
        return Err(LendingError::BorrowLimitReached {
            patron_id,
            open_loans,
            limit: deps.policy.max_open_loans,
        });
    }

    Ok(())
}

/// 資料を貸し出す
///
/// すべての前提条件を確認してから、在庫の条件付き減算と貸出記録の作成を
/// この順で行う。2つの更新は1つのトランザクションではない。
///
/// # エラー
/// - 前提条件: `PatronNotFound`, `PatronNotActive`, `ItemNotFound`,
///   `NoCopiesAvailable`, `BorrowLimitReached`, `InvalidLoanPeriod`
/// - `CopyCountConflict`: 確認後に別の貸出が在庫を使い切った（再試行可）
/// - `Inconsistency`: 在庫を減らした後に貸出記録の作成に失敗した。
///   在庫は戻さない（運用で修復する）
#[tracing::instrument(
    skip(deps, cmd),
    fields(patron_id = %cmd.patron_id, item_id = %cmd.item_id, days = cmd.loan_period_days)
)]
pub async fn borrow(deps: &ServiceDependencies, cmd: BorrowItem) -> Result<Loan> {
    let now = deps.clock.now();

    let new_loan = domain::loan::new_loan(cmd.patron_id, cmd.item_id, now, cmd.loan_period_days)
        .map_err(|e| match e {
            NewLoanError::NonPositivePeriod(days) | NewLoanError::DueDateOutOfRange(days) => {
                LendingError::InvalidLoanPeriod(days)
            }
        })?;

    if let Err(e) = check_borrow_preconditions(deps, cmd.patron_id, cmd.item_id).await {
        tracing::warn!(error = %e, "Borrow rejected");
        return Err(e);
    }

    let decremented = deps
        .catalog
        .try_decrement(cmd.item_id)
        .await
        .map_err(LendingError::CatalogError)?;

    if !decremented {
        tracing::warn!("Copy count exhausted between check and decrement");
        return Err(LendingError::CopyCountConflict(cmd.item_id));
    }

    let loan = match deps.loan_store.create(new_loan).await {
        Ok(loan) => loan,
        Err(source) => {
            let inconsistency = Inconsistency::CopyTakenWithoutLoan {
                patron_id: cmd.patron_id,
                item_id: cmd.item_id,
                source,
            };
            tracing::error!(error = %inconsistency, "Manual reconciliation required");
            return Err(inconsistency.into());
        }
    };

    tracing::info!(loan_id = %loan.id, due_at = %loan.due_at, "Item borrowed");
    Ok(loan)
}

/// 資料を返却する
///
/// 1. 貸出が存在し、未返却であることを確認
/// 2. 現在時刻までの延滞料金を確定させる
/// 3. 条件付き更新で返却を記録（並行する更新に負けたら読み直して理由を返す）
/// 4. 返却が記録された後でのみ在庫を1戻す
///
/// 4が失敗しても貸出は返却済みとして扱い、`Inconsistency` を返す。
#[tracing::instrument(skip(deps, cmd), fields(loan_id = %cmd.loan_id))]
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<ReturnReceipt> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    if !loan.is_open() {
        tracing::warn!("Loan already returned");
        return Err(LendingError::AlreadyReturned(loan.id));
    }

    loan.status
        .transition(LoanStatus::Returned)
        .map_err(|source| LendingError::IllegalTransition {
            loan_id: loan.id,
            source,
        })?;

    let now = deps.clock.now();
    let fine = fine::compute_fine(&loan, now, deps.policy.daily_fine_rate);

    // 返却後は set_fine が効かないため、ここで確定させる
    let fine_applied = deps
        .loan_store
        .set_fine(loan.id, fine)
        .await
        .map_err(LendingError::LoanStoreError)?;
    if !fine_applied {
        tracing::debug!(fine = %fine, "Fine not lowered below persisted amount");
    }

    let marked = deps
        .loan_store
        .mark_returned(loan.id, now)
        .await
        .map_err(LendingError::LoanStoreError)?;

    if !marked {
        return Err(concurrent_return_error(deps, &loan).await?);
    }

    let restore_failure = match deps.catalog.increment(loan.item_id).await {
        Ok(true) => None,
        Ok(false) => Some("catalog rejected the increment".to_string()),
        Err(e) => Some(e.to_string()),
    };

    if let Some(reason) = restore_failure {
        let inconsistency = Inconsistency::ReturnedWithoutCopyRestored {
            loan_id: loan.id,
            item_id: loan.item_id,
            reason,
        };
        tracing::error!(error = %inconsistency, "Manual reconciliation required");
        return Err(inconsistency.into());
    }

    let fine = fine.max(loan.fine_amount.unwrap_or(Money::ZERO));
    tracing::info!(item_id = %loan.item_id, fine = %fine, "Loan returned");

    Ok(ReturnReceipt {
        loan_id: loan.id,
        item_id: loan.item_id,
        returned_at: now,
        fine,
    })
}

/// 返却の条件付き更新に負けた理由を読み直して決める
///
/// - 返却済み：`AlreadyReturned`
/// - 紛失など返却できない状態：`IllegalTransition`
/// - それ以外：`LoanStateConflict`
async fn concurrent_return_error(
    deps: &ServiceDependencies,
    loan: &Loan,
) -> Result<LendingError> {
    let current = load_loan(deps, loan.id).await?;

    if !current.is_open() {
        tracing::warn!("Lost the race to a concurrent return");
        return Ok(LendingError::AlreadyReturned(loan.id));
    }

    if let Err(source) = current.status.transition(LoanStatus::Returned) {
        tracing::warn!(status = current.status.as_str(), "Loan changed state before return");
        return Ok(LendingError::IllegalTransition {
            loan_id: loan.id,
            source,
        });
    }

    Ok(LendingError::LoanStateConflict {
        loan_id: loan.id,
        expected: loan.status,
    })
}

/// 現在時刻での延滞料金を計算する（状態は変更しない）
pub async fn calculate_fine(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Money> {
    let loan = load_loan(deps, loan_id).await?;
    let fine = fine::compute_fine(&loan, deps.clock.now(), deps.policy.daily_fine_rate);
    tracing::debug!(loan_id = %loan_id, fine = %fine, "Fine calculated");
    Ok(fine)
}

/// 貸出可能かを事前確認する
///
/// 貸出と同じ前提条件を副作用なしで確認する。在庫の予約はしないため、
/// `true` は保証ではなく目安であり、並行する貸出によってすぐに古くなりうる。
/// I/Oエラーのみ `Err` で返す。
pub async fn eligibility(
    deps: &ServiceDependencies,
    patron_id: PatronId,
    item_id: ItemId,
) -> Result<bool> {
    match check_borrow_preconditions(deps, patron_id, item_id).await {
        Ok(()) => Ok(true),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidState) => {
            tracing::debug!(reason = %e, "Not eligible");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// 貸出を紛失扱いにする（管理者操作）
///
/// Borrowed / Overdue のみ受け付ける。在庫は戻さない。
/// 紛失した貸出は未返却のまま残り、延滞検出の対象外になる。
#[tracing::instrument(skip(deps, cmd), fields(loan_id = %cmd.loan_id))]
pub async fn declare_lost(deps: &ServiceDependencies, cmd: DeclareLost) -> Result<()> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    loan.status
        .transition(LoanStatus::Lost)
        .map_err(|source| LendingError::IllegalTransition {
            loan_id: loan.id,
            source,
        })?;

    let applied = deps
        .loan_store
        .set_status(loan.id, LoanStatus::Lost)
        .await
        .map_err(LendingError::LoanStoreError)?;

    if !applied {
        return Err(LendingError::LoanStateConflict {
            loan_id: loan.id,
            expected: loan.status,
        });
    }

    tracing::info!(item_id = %loan.item_id, "Loan declared lost");
    Ok(())
}

/// IDで貸出を取得する
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    load_loan(deps, loan_id).await
}

/// 利用者の貸出履歴（新しい順）
pub async fn patron_loans(deps: &ServiceDependencies, patron_id: PatronId) -> Result<Vec<Loan>> {
    deps.loan_store
        .find_by_patron(patron_id)
        .await
        .map_err(LendingError::LoanStoreError)
}

/// 利用者の未返却の貸出（新しい順）
pub async fn patron_open_loans(
    deps: &ServiceDependencies,
    patron_id: PatronId,
) -> Result<Vec<Loan>> {
    let loans = patron_loans(deps, patron_id).await?;
    Ok(loans.into_iter().filter(Loan::is_open).collect())
}
