use crate::domain::{Loan, LoanId, LoanStatus, Money, fine};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::errors::{LendingError, Result};
use super::loan_service::ServiceDependencies;

/// 1件の貸出の処理に失敗した記録
#[derive(Debug)]
pub struct ReconciliationFailure {
    pub loan_id: LoanId,
    pub error: LendingError,
}

/// 延滞照合の結果
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    /// 延滞候補として取得した件数
    pub examined: usize,
    /// Overdue に遷移させた件数
    pub marked_overdue: usize,
    /// 延滞料金を保存した件数
    pub fines_updated: usize,
    /// 照合中に返却・紛失されていたため処理しなかった件数
    pub skipped: usize,
    pub failures: Vec<ReconciliationFailure>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum LoanOutcome {
    Updated { transitioned: bool, fine_saved: bool },
    Skipped,
}

/// 延滞照合
///
/// 未返却かつ返却期限 < now の貸出それぞれについて：
/// - Overdue でなければ Overdue に遷移させる
/// - 延滞料金を再計算して保存する
///
/// 冪等：既に Overdue の貸出は料金が更新されるだけで、二重に遷移しない。
/// Returned / Lost の貸出は候補に含まれない。
/// 1件の失敗は残りの処理を止めず、結果の `failures` に集めて返す。
/// 候補の取得自体に失敗した場合のみ `Err` を返す。
#[tracing::instrument(skip(deps))]
pub async fn reconcile_overdue(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> Result<ReconciliationReport> {
    let candidates = deps
        .loan_store
        .find_overdue(now)
        .await
        .map_err(LendingError::LoanStoreError)?;

    let mut report = ReconciliationReport {
        examined: candidates.len(),
        ..Default::default()
    };

    for loan in candidates {
        match reconcile_loan(deps, &loan, now).await {
            Ok(LoanOutcome::Updated {
                transitioned,
                fine_saved,
            }) => {
                if transitioned {
                    report.marked_overdue += 1;
                }
                if fine_saved {
                    report.fines_updated += 1;
                }
            }
            Ok(LoanOutcome::Skipped) => report.skipped += 1,
            Err(error) => {
                tracing::warn!(loan_id = %loan.id, error = %error, "Failed to reconcile loan");
                report.failures.push(ReconciliationFailure {
                    loan_id: loan.id,
                    error,
                });
            }
        }
    }

    tracing::info!(
        examined = report.examined,
        marked_overdue = report.marked_overdue,
        fines_updated = report.fines_updated,
        skipped = report.skipped,
        failures = report.failures.len(),
        "Overdue reconciliation completed"
    );

    Ok(report)
}

async fn reconcile_loan(
    deps: &ServiceDependencies,
    loan: &Loan,
    now: DateTime<Utc>,
) -> Result<LoanOutcome> {
    if loan.status.is_terminal() {
        return Ok(LoanOutcome::Skipped);
    }

    let mut transitioned = false;

    if loan.status != LoanStatus::Overdue {
        let applied = deps
            .loan_store
            .set_status(loan.id, LoanStatus::Overdue)
            .await
            .map_err(LendingError::LoanStoreError)?;

        if applied {
            transitioned = true;
        } else if !still_overdue(deps, loan.id).await? {
            // 並行して返却または紛失された
            return Ok(LoanOutcome::Skipped);
        }
    }

    let amount: Money = fine::compute_fine(loan, now, deps.policy.daily_fine_rate);
    let fine_saved = deps
        .loan_store
        .set_fine(loan.id, amount)
        .await
        .map_err(LendingError::LoanStoreError)?;

    tracing::debug!(loan_id = %loan.id, fine = %amount, transitioned, fine_saved, "Loan reconciled");

    Ok(LoanOutcome::Updated {
        transitioned,
        fine_saved,
    })
}

/// 別の照合が先に Overdue にした場合は処理を続ける
async fn still_overdue(deps: &ServiceDependencies, loan_id: LoanId) -> Result<bool> {
    let current = deps
        .loan_store
        .find_by_id(loan_id)
        .await
        .map_err(LendingError::LoanStoreError)?;

    Ok(matches!(current, Some(loan) if loan.is_open() && loan.status == LoanStatus::Overdue))
}

/// 一定間隔で延滞照合を実行するタスクを起動する
///
/// 最初の照合は起動直後に行う。失敗はログに記録してループを続ける。
pub fn spawn_reconciliation_loop(deps: ServiceDependencies, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = deps.clock.now();

            match reconcile_overdue(&deps, now).await {
                Ok(report) if report.is_clean() => {}
                Ok(report) => {
                    tracing::warn!(
                        failures = report.failures.len(),
                        "Overdue reconciliation finished with failures"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Overdue reconciliation could not run");
                }
            }
        }
    })
}
