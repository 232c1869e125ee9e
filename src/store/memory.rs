use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;

use super::{Store, StoreError, StoreResult};
use crate::{
    auth::repo_types::{NewUser, User},
    menu::repo_types::MenuRow,
    points::repo_types::{LedgerSnapshot, PointEntry, RankingRow},
};

/// In-process store with the same contract as [`super::PgStore`].
///
/// A single lock guards every table, so each call is one atomic unit just like
/// a Postgres transaction.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    points: Vec<PointEntry>,
    menus: Vec<MenuRow>,
    next_user_id: i64,
    next_point_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_menu(&self, menu: MenuRow) {
        self.inner.lock().await.menus.push(menu);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser<'_>) -> StoreResult<User> {
        let mut t = self.inner.lock().await;
        if t.users.iter().any(|u| u.school_number == user.school_number) {
            return Err(StoreError::Duplicate("school number"));
        }
        t.next_user_id += 1;
        let row = User {
            id: t.next_user_id,
            name: user.name.to_string(),
            nick_name: user.nick_name.to_string(),
            school_number: user.school_number.to_string(),
            password_hash: user.password_hash.to_string(),
            points: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_user_by_school_number(&self, school_number: &str) -> StoreResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.school_number == school_number).cloned())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn append_point(
        &self,
        user_id: i64,
        delta: i64,
        description: &str,
    ) -> StoreResult<PointEntry> {
        let mut t = self.inner.lock().await;
        let Some(idx) = t.users.iter().position(|u| u.id == user_id) else {
            return Err(StoreError::NotFound("user"));
        };
        // Same outcome as the BIGINT overflow Postgres raises for `points + delta`.
        let Some(next_total) = t.users[idx].points.checked_add(delta) else {
            return Err(anyhow::anyhow!("points total overflow for user {user_id}").into());
        };
        t.next_point_id += 1;
        let entry = PointEntry {
            id: t.next_point_id,
            user_id,
            point: delta,
            description: description.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.points.push(entry.clone());
        t.users[idx].points = next_total;
        Ok(entry)
    }

    async fn ledger(&self, user_id: i64) -> StoreResult<Option<LedgerSnapshot>> {
        let t = self.inner.lock().await;
        let Some(user) = t.users.iter().find(|u| u.id == user_id).cloned() else {
            return Ok(None);
        };
        let mut entries: Vec<PointEntry> = t
            .points
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(Some(LedgerSnapshot { user, entries }))
    }

    async fn ranking(&self) -> StoreResult<Vec<RankingRow>> {
        let t = self.inner.lock().await;
        let mut rows: Vec<RankingRow> = t
            .users
            .iter()
            .map(|u| RankingRow {
                name: u.name.clone(),
                nick_name: u.nick_name.clone(),
                school_number: u.school_number.clone(),
                points: u.points,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.school_number.cmp(&b.school_number))
        });
        Ok(rows)
    }

    async fn menus_for(&self, restaurant_type: &str, date: Date) -> StoreResult<Vec<MenuRow>> {
        let t = self.inner.lock().await;
        Ok(t.menus
            .iter()
            .filter(|m| m.restaurant_type == restaurant_type && m.date == date)
            .cloned()
            .collect())
    }
}
