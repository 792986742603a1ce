use chrono::{DateTime, Utc};

use super::{Loan, Money};

/// 純粋関数：延滞料金を計算する
///
/// - 返却済み：返却時に確定した料金をそのまま返す（再計算しない）
/// - 期限内（now <= due_at）：0
/// - 延滞中：満了した日数 × 日額。24時間未満の端数は切り捨て
pub fn compute_fine(loan: &Loan, now: DateTime<Utc>, daily_rate: Money) -> Money {
    if loan.returned_at.is_some() {
        return loan.fine_amount.unwrap_or(Money::ZERO);
    }

    if now <= loan.due_at {
        return Money::ZERO;
    }

    let overdue_days = (now - loan.due_at).num_days();
    daily_rate.times(overdue_days)
}
