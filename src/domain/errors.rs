use super::LoanStatus;
use thiserror::Error;

/// 状態遷移のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition loan from {} to {}", .from.as_str(), .to.as_str())]
pub struct TransitionError {
    pub from: LoanStatus,
    pub to: LoanStatus,
}

/// 貸出作成のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewLoanError {
    /// 貸出期間は1日以上
    NonPositivePeriod(i64),
    /// 期限の計算が日時の表現範囲を超えた
    DueDateOutOfRange(i64),
}
