use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, LoanId, Money, NewLoanError, PatronId, TransitionError};

/// 貸出ステータス
///
/// 遷移表：
/// - Borrowed → Overdue, Returned, Lost
/// - Overdue → Returned, Lost
/// - Returned, Lost は終端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// 貸出中
    Borrowed,
    /// 延滞中
    Overdue,
    /// 返却済み
    Returned,
    /// 紛失
    Lost,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Borrowed,
        LoanStatus::Overdue,
        LoanStatus::Returned,
        LoanStatus::Lost,
    ];

    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "borrowed",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
            LoanStatus::Lost => "lost",
        }
    }

    /// この状態から `next` への遷移が許されるか
    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, next),
            (Borrowed, Overdue)
                | (Borrowed, Returned)
                | (Borrowed, Lost)
                | (Overdue, Returned)
                | (Overdue, Lost)
        )
    }

    /// `next` へ遷移できる直前の状態の一覧
    ///
    /// 条件付き更新（WHERE status = ANY(...)）のガードに使う。
    pub fn predecessors_of(next: LoanStatus) -> Vec<LoanStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }

    /// 遷移を検証する
    pub fn transition(self, next: LoanStatus) -> Result<LoanStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// 以後どの状態にも遷移できない
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Returned | LoanStatus::Lost)
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(LoanStatus::Borrowed),
            "overdue" => Ok(LoanStatus::Overdue),
            "returned" => Ok(LoanStatus::Returned),
            "lost" => Ok(LoanStatus::Lost),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 貸出記録 - 1人の利用者による1点の資料の1回の貸出
///
/// 不変条件：
/// - `returned_at` が Some であることと `status == Returned` は同値
/// - `due_at` は作成時に決まり、以後変更されない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,

    pub patron_id: PatronId,
    pub item_id: ItemId,

    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,

    pub fine_amount: Option<Money>,
    pub fine_paid: bool,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// 未返却（returned_at が未設定）か
    ///
    /// 紛失した貸出も未返却として数える。
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// 延滞判定：未返却かつ返却期限を過ぎている
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_at < now
    }
}

/// ストアに渡す作成前の貸出
///
/// ID とタイムスタンプはストアが採番する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub patron_id: PatronId,
    pub item_id: ItemId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// 純粋関数：作成前の貸出を組み立てる
///
/// - 返却期限 = 貸出日時 + 貸出期間（日）
/// - 初期状態は常に Borrowed（ストアが設定）
pub fn new_loan(
    patron_id: PatronId,
    item_id: ItemId,
    borrowed_at: DateTime<Utc>,
    loan_period_days: i64,
) -> Result<NewLoan, NewLoanError> {
    if loan_period_days <= 0 {
        return Err(NewLoanError::NonPositivePeriod(loan_period_days));
    }

    let due_at = Duration::try_days(loan_period_days)
        .and_then(|period| borrowed_at.checked_add_signed(period))
        .ok_or(NewLoanError::DueDateOutOfRange(loan_period_days))?;

    Ok(NewLoan {
        patron_id,
        item_id,
        borrowed_at,
        due_at,
        notes: Some(format!("borrowed for {} days", loan_period_days)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_loan_sets_due_date_from_period() {
        let borrowed_at = Utc::now();
        let loan = new_loan(PatronId::new(), ItemId::new(), borrowed_at, 14).unwrap();

        assert_eq!(loan.due_at, borrowed_at + Duration::days(14));
        assert_eq!(loan.borrowed_at, borrowed_at);
        assert_eq!(loan.notes.as_deref(), Some("borrowed for 14 days"));
    }

    #[test]
    fn test_new_loan_rejects_non_positive_period() {
        let now = Utc::now();
        assert_eq!(
            new_loan(PatronId::new(), ItemId::new(), now, 0),
            Err(NewLoanError::NonPositivePeriod(0))
        );
        assert_eq!(
            new_loan(PatronId::new(), ItemId::new(), now, -3),
            Err(NewLoanError::NonPositivePeriod(-3))
        );
    }

    #[test]
    fn test_new_loan_rejects_period_out_of_range() {
        let result = new_loan(PatronId::new(), ItemId::new(), Utc::now(), i64::MAX);
        assert_eq!(result, Err(NewLoanError::DueDateOutOfRange(i64::MAX)));
    }

    #[test]
    fn test_transition_table() {
        use LoanStatus::*;

        assert!(Borrowed.can_transition_to(Overdue));
        assert!(Borrowed.can_transition_to(Returned));
        assert!(Borrowed.can_transition_to(Lost));
        assert!(Overdue.can_transition_to(Returned));
        assert!(Overdue.can_transition_to(Lost));

        assert!(!Overdue.can_transition_to(Borrowed));
        assert!(!Overdue.can_transition_to(Overdue));
        for next in LoanStatus::ALL {
            assert!(!Returned.can_transition_to(next));
            assert!(!Lost.can_transition_to(next));
        }
    }

    #[test]
    fn test_transition_rejects_returned_to_borrowed() {
        let result = LoanStatus::Returned.transition(LoanStatus::Borrowed);
        assert_eq!(
            result,
            Err(TransitionError {
                from: LoanStatus::Returned,
                to: LoanStatus::Borrowed,
            })
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(LoanStatus::Returned.is_terminal());
        assert!(LoanStatus::Lost.is_terminal());
        assert!(!LoanStatus::Borrowed.is_terminal());
        assert!(!LoanStatus::Overdue.is_terminal());
    }

    #[test]
    fn test_predecessors_of() {
        assert_eq!(
            LoanStatus::predecessors_of(LoanStatus::Overdue),
            vec![LoanStatus::Borrowed]
        );
        assert_eq!(
            LoanStatus::predecessors_of(LoanStatus::Lost),
            vec![LoanStatus::Borrowed, LoanStatus::Overdue]
        );
        assert!(LoanStatus::predecessors_of(LoanStatus::Borrowed).is_empty());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in LoanStatus::ALL {
            assert_eq!(status.as_str().parse::<LoanStatus>(), Ok(status));
        }
        assert!("active".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_is_past_due() {
        let now = Utc::now();
        let mut loan = Loan {
            id: LoanId::new(),
            patron_id: PatronId::new(),
            item_id: ItemId::new(),
            borrowed_at: now - Duration::days(20),
            due_at: now - Duration::days(6),
            returned_at: None,
            status: LoanStatus::Borrowed,
            fine_amount: None,
            fine_paid: false,
            notes: None,
            created_at: now - Duration::days(20),
            updated_at: now - Duration::days(20),
        };
        assert!(loan.is_past_due(now));
        assert!(!loan.is_past_due(loan.due_at));

        loan.returned_at = Some(now);
        loan.status = LoanStatus::Returned;
        assert!(!loan.is_past_due(now));
    }
}
