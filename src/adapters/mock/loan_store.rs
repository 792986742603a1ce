use crate::adapters::clock::SystemClock;
use crate::domain::{ItemId, Loan, LoanId, LoanStatus, Money, NewLoan, PatronId};
use crate::ports::clock::Clock;
use crate::ports::loan_store::{LoanStore as LoanStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// LoanStoreのインメモリ実装
///
/// 条件付き更新は確認と書き込みを1つのロックの中で行うため、
/// `UPDATE ... WHERE` の1文と同じように振る舞う。
/// 貸出は登録順に保持し、`updated_at` は時計から取る。
pub struct LoanStore {
    loans: Mutex<Vec<Loan>>,
    clock: Arc<dyn Clock>,
    fail_creates: AtomicBool,
}

impl LoanStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            loans: Mutex::new(Vec::new()),
            clock,
            fail_creates: AtomicBool::new(false),
        }
    }

    /// `true` の間、create はエラーを返す
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// 資料を参照している未返却の貸出数（テスト用）
    pub fn count_open_by_item(&self, item_id: ItemId) -> usize {
        self.loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.item_id == item_id && l.is_open())
            .count()
    }

    /// `guard` を満たす場合のみ `update` を適用する
    fn update_if<G, U>(&self, loan_id: LoanId, guard: G, update: U) -> bool
    where
        G: FnOnce(&Loan) -> bool,
        U: FnOnce(&mut Loan),
    {
        let now = self.clock.now();
        let mut loans = self.loans.lock().unwrap();
        match loans.iter_mut().find(|l| l.id == loan_id) {
            Some(loan) if guard(loan) => {
                update(loan);
                loan.updated_at = now;
                true
            }
            _ => false,
        }
    }

    fn newest_first(mut loans: Vec<Loan>) -> Vec<Loan> {
        loans.reverse();
        loans.sort_by(|a, b| b.borrowed_at.cmp(&a.borrowed_at));
        loans
    }
}

impl Default for LoanStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn create(&self, new_loan: NewLoan) -> Result<Loan> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err("loan store unavailable".into());
        }

        let now = self.clock.now();
        let loan = Loan {
            id: LoanId::new(),
            patron_id: new_loan.patron_id,
            item_id: new_loan.item_id,
            borrowed_at: new_loan.borrowed_at,
            due_at: new_loan.due_at,
            returned_at: None,
            status: LoanStatus::Borrowed,
            fine_amount: None,
            fine_paid: false,
            notes: new_loan.notes,
            created_at: now,
            updated_at: now,
        };

        self.loans.lock().unwrap().push(loan.clone());
        Ok(loan)
    }

    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let loans = self.loans.lock().unwrap();
        Ok(loans.iter().find(|l| l.id == loan_id).cloned())
    }

    async fn find_by_patron(&self, patron_id: PatronId) -> Result<Vec<Loan>> {
        let matching: Vec<Loan> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.patron_id == patron_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn find_by_item(&self, item_id: ItemId) -> Result<Vec<Loan>> {
        let matching: Vec<Loan> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.item_id == item_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn find_open(&self) -> Result<Vec<Loan>> {
        let open: Vec<Loan> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.is_open())
            .cloned()
            .collect();
        Ok(Self::newest_first(open))
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let mut overdue: Vec<Loan> = self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.is_past_due(now) && l.status != LoanStatus::Lost)
            .cloned()
            .collect();
        overdue.sort_by(|a, b| a.due_at.cmp(&b.due_at));
        Ok(overdue)
    }

    async fn mark_returned(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> Result<bool> {
        Ok(self.update_if(
            loan_id,
            |loan| loan.is_open() && loan.status.can_transition_to(LoanStatus::Returned),
            |loan| {
                loan.returned_at = Some(returned_at);
                loan.status = LoanStatus::Returned;
            },
        ))
    }

    async fn set_status(&self, loan_id: LoanId, status: LoanStatus) -> Result<bool> {
        if status == LoanStatus::Returned {
            return Ok(false);
        }

        Ok(self.update_if(
            loan_id,
            |loan| loan.is_open() && loan.status.can_transition_to(status),
            |loan| loan.status = status,
        ))
    }

    async fn set_fine(&self, loan_id: LoanId, amount: Money) -> Result<bool> {
        Ok(self.update_if(
            loan_id,
            |loan| loan.is_open() && loan.fine_amount.is_none_or(|current| current <= amount),
            |loan| loan.fine_amount = Some(amount),
        ))
    }

    async fn count_open_by_patron(&self, patron_id: PatronId) -> Result<usize> {
        let loans = self.loans.lock().unwrap();
        Ok(loans
            .iter()
            .filter(|l| l.patron_id == patron_id && l.is_open())
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::FixedClock;
    use chrono::Duration;

    fn new_loan(patron_id: PatronId, item_id: ItemId, borrowed_at: DateTime<Utc>) -> NewLoan {
        NewLoan {
            patron_id,
            item_id,
            borrowed_at,
            due_at: borrowed_at + Duration::days(14),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_borrowed_status() {
        let store = LoanStore::new();
        let now = Utc::now();
        let loan = store
            .create(new_loan(PatronId::new(), ItemId::new(), now))
            .await
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Borrowed);
        assert!(loan.returned_at.is_none());
        assert!(loan.fine_amount.is_none());
        assert!(!loan.fine_paid);

        let found = store.find_by_id(loan.id).await.unwrap();
        assert_eq!(found, Some(loan));
    }

    #[tokio::test]
    async fn test_mark_returned_is_at_most_once() {
        let store = LoanStore::new();
        let now = Utc::now();
        let loan = store
            .create(new_loan(PatronId::new(), ItemId::new(), now))
            .await
            .unwrap();

        let first = now + Duration::days(1);
        let second = now + Duration::days(2);
        assert!(store.mark_returned(loan.id, first).await.unwrap());
        assert!(!store.mark_returned(loan.id, second).await.unwrap());

        let stored = store.find_by_id(loan.id).await.unwrap().unwrap();
        assert_eq!(stored.returned_at, Some(first));
        assert_eq!(stored.status, LoanStatus::Returned);
    }

    #[tokio::test]
    async fn test_set_status_follows_transition_table() {
        let store = LoanStore::new();
        let loan = store
            .create(new_loan(PatronId::new(), ItemId::new(), Utc::now()))
            .await
            .unwrap();

        assert!(!store.set_status(loan.id, LoanStatus::Returned).await.unwrap());
        assert!(!store.set_status(loan.id, LoanStatus::Borrowed).await.unwrap());
        assert!(store.set_status(loan.id, LoanStatus::Overdue).await.unwrap());
        assert!(!store.set_status(loan.id, LoanStatus::Overdue).await.unwrap());
        assert!(store.set_status(loan.id, LoanStatus::Lost).await.unwrap());
        assert!(!store.set_status(loan.id, LoanStatus::Overdue).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_fine_never_decreases_and_stops_after_return() {
        let store = LoanStore::new();
        let now = Utc::now();
        let loan = store
            .create(new_loan(PatronId::new(), ItemId::new(), now))
            .await
            .unwrap();

        let ten = Money::from_minor_units(10000);
        assert!(store.set_fine(loan.id, ten).await.unwrap());
        assert!(store.set_fine(loan.id, ten).await.unwrap());
        assert!(!store.set_fine(loan.id, Money::from_minor_units(5000)).await.unwrap());

        store.mark_returned(loan.id, now).await.unwrap();
        assert!(!store.set_fine(loan.id, Money::from_minor_units(20000)).await.unwrap());

        let stored = store.find_by_id(loan.id).await.unwrap().unwrap();
        assert_eq!(stored.fine_amount, Some(ten));
    }

    #[tokio::test]
    async fn test_find_overdue_excludes_returned_and_lost() {
        let store = LoanStore::new();
        let now = Utc::now();
        let long_ago = now - Duration::days(30);

        let open = store
            .create(new_loan(PatronId::new(), ItemId::new(), long_ago))
            .await
            .unwrap();
        let returned = store
            .create(new_loan(PatronId::new(), ItemId::new(), long_ago))
            .await
            .unwrap();
        let lost = store
            .create(new_loan(PatronId::new(), ItemId::new(), long_ago))
            .await
            .unwrap();
        store
            .create(new_loan(PatronId::new(), ItemId::new(), now))
            .await
            .unwrap();

        store.mark_returned(returned.id, now).await.unwrap();
        store.set_status(lost.id, LoanStatus::Lost).await.unwrap();

        let overdue = store.find_overdue(now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, open.id);

        // 紛失は未返却として残る
        assert_eq!(store.find_open().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_find_by_patron_newest_first() {
        let store = LoanStore::new();
        let patron_id = PatronId::new();
        let now = Utc::now();

        let older = store
            .create(new_loan(patron_id, ItemId::new(), now - Duration::days(3)))
            .await
            .unwrap();
        let newer = store
            .create(new_loan(patron_id, ItemId::new(), now))
            .await
            .unwrap();
        store
            .create(new_loan(PatronId::new(), ItemId::new(), now))
            .await
            .unwrap();

        let loans = store.find_by_patron(patron_id).await.unwrap();
        let ids: Vec<LoanId> = loans.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(store.count_open_by_patron(patron_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_updates_bump_updated_at() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let store = LoanStore::with_clock(clock.clone());
        let loan = store
            .create(new_loan(PatronId::new(), ItemId::new(), clock.now()))
            .await
            .unwrap();

        clock.advance(Duration::hours(2));
        store.set_status(loan.id, LoanStatus::Overdue).await.unwrap();

        let stored = store.find_by_id(loan.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, loan.updated_at + Duration::hours(2));
        assert_eq!(stored.created_at, loan.created_at);
    }
}
