use serde::{Deserialize, Serialize};

use super::Money;

/// 会員1人あたりの同時貸出上限（既定値）
pub const DEFAULT_MAX_OPEN_LOANS: usize = 5;

/// 延滞1日あたりの料金（既定値、通貨の最小単位）
pub const DEFAULT_DAILY_FINE_RATE: i64 = 5000;

/// 貸出期間（既定値、日数）
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// 貸出ポリシー
///
/// 上限冊数・延滞料金の日額・既定の貸出期間をまとめた設定値。
/// 延滞料金に上限や猶予期間はない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingPolicy {
    pub max_open_loans: usize,
    pub daily_fine_rate: Money,
    pub default_loan_period_days: i64,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            max_open_loans: DEFAULT_MAX_OPEN_LOANS,
            daily_fine_rate: Money::from_minor_units(DEFAULT_DAILY_FINE_RATE),
            default_loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}
