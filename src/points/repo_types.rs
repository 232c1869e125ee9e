use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PointEntry {
    pub id: i64,
    pub user_id: i64,
    pub point: i64,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub name: String,
    pub nick_name: String,
    pub school_number: String,
    pub points: i64,
}

/// A user together with their whole ledger, read in one consistent snapshot.
/// Entries are newest first.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub user: User,
    pub entries: Vec<PointEntry>,
}

impl LedgerSnapshot {
    /// Sum of all entries, or `None` when it does not fit in `i64`.
    /// Partial sums are widened, so entry order never matters.
    pub fn ledger_total(&self) -> Option<i64> {
        let wide: i128 = self.entries.iter().map(|e| i128::from(e.point)).sum();
        i64::try_from(wide).ok()
    }
}
