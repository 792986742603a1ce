use chrono::{DateTime, Utc};

/// 現在時刻の取得元
///
/// 貸出日時・返却日時・延滞料金の計算に使うサーバー時刻。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
