use serde::{Deserialize, Serialize};

use super::{ItemId, LoanId, PatronId};

/// コマンド：資料を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowItem {
    pub patron_id: PatronId,
    pub item_id: ItemId,
    pub loan_period_days: i64,
}

/// コマンド：資料を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
}

/// コマンド：貸出を紛失扱いにする（管理者操作）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclareLost {
    pub loan_id: LoanId,
}
