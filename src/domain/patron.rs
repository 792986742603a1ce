use serde::{Deserialize, Serialize};

use super::PatronId;

/// 利用者の状態（利用者ディレクトリが管理する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatronStatus {
    Active,
    Suspended,
    Inactive,
}

impl PatronStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatronStatus::Active => "active",
            PatronStatus::Suspended => "suspended",
            PatronStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for PatronStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PatronStatus::Active),
            "suspended" => Ok(PatronStatus::Suspended),
            "inactive" => Ok(PatronStatus::Inactive),
            _ => Err(format!("Invalid patron status: {}", s)),
        }
    }
}

/// 利用者 - 貸出コンテキストが知るのはIDと状態のみ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patron {
    pub id: PatronId,
    pub status: PatronStatus,
}

impl Patron {
    pub fn is_active(&self) -> bool {
        self.status == PatronStatus::Active
    }
}
