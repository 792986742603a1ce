use crate::domain::{ItemId, Loan, LoanId, LoanStatus, Money, NewLoan, PatronId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出ストアポート
///
/// 貸出記録の永続化を抽象化する。
/// 更新系はすべて現在の状態を条件とした条件付き更新であり、
/// 条件を満たさなかった場合はエラーではなく `false` を返す。
/// 呼び出し側は `false` を受けたら状態を読み直してから判断すること。
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// 貸出を作成する
    ///
    /// ID・created_at・updated_at をストアが採番し、状態は Borrowed で作成する。
    async fn create(&self, new_loan: NewLoan) -> Result<Loan>;

    /// IDで貸出を取得する
    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 利用者の全貸出を新しい順で取得する
    async fn find_by_patron(&self, patron_id: PatronId) -> Result<Vec<Loan>>;

    /// 資料の全貸出を新しい順で取得する
    async fn find_by_item(&self, item_id: ItemId) -> Result<Vec<Loan>>;

    /// 未返却（returned_at IS NULL）の貸出を取得する
    async fn find_open(&self) -> Result<Vec<Loan>>;

    /// 延滞候補を取得する
    ///
    /// returned_at IS NULL かつ due_at < now、紛失（Lost）を除く。
    /// due_at の古い順。
    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>>;

    /// 返却を記録する
    ///
    /// 未返却の場合のみ returned_at と status = Returned を設定する。
    /// 既に返却済みなら上書きせず `false` を返す（高々1回）。
    async fn mark_returned(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> Result<bool>;

    /// 状態を更新する
    ///
    /// 未返却かつ現在の状態から `status` への遷移が許される場合のみ適用する。
    async fn set_status(&self, loan_id: LoanId, status: LoanStatus) -> Result<bool>;

    /// 延滞料金を更新する
    ///
    /// 未返却かつ保存済みの料金を下回らない場合のみ適用する。
    async fn set_fine(&self, loan_id: LoanId, amount: Money) -> Result<bool>;

    /// 利用者の未返却の貸出件数
    async fn count_open_by_patron(&self, patron_id: PatronId) -> Result<usize>;
}
