use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use tracing::debug;

use super::{Store, StoreError, StoreResult};
use crate::{
    auth::repo_types::{NewUser, User},
    menu::repo_types::MenuRow,
    points::repo_types::{LedgerSnapshot, PointEntry, RankingRow},
};

const USER_COLUMNS: &str = "id, name, nick_name, school_number, password_hash, points, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser<'_>) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (name, nick_name, school_number, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let res = sqlx::query_as::<_, User>(&sql)
            .bind(user.name)
            .bind(user.nick_name)
            .bind(user.school_number)
            .bind(user.password_hash)
            .fetch_one(&self.db)
            .await;
        match res {
            Ok(u) => Ok(u),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate("school number")),
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn find_user_by_school_number(&self, school_number: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE school_number = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(school_number)
            .fetch_optional(&self.db)
            .await
            .context("find user by school number")?;
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn append_point(
        &self,
        user_id: i64,
        delta: i64,
        description: &str,
    ) -> StoreResult<PointEntry> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Row lock serialises concurrent awards for the same user.
        let locked: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock user row")?;
        if locked.is_none() {
            return Err(StoreError::NotFound("user"));
        }

        let entry = sqlx::query_as::<_, PointEntry>(
            r#"
            INSERT INTO points (user_id, point, description)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, point, description, created_at
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .context("insert point entry")?;

        sqlx::query("UPDATE users SET points = points + $2 WHERE id = $1")
            .bind(user_id)
            .bind(delta)
            .execute(&mut *tx)
            .await
            .context("update cached points")?;

        tx.commit().await.context("commit tx")?;
        debug!(user_id, entry_id = entry.id, delta, "point entry appended");
        Ok(entry)
    }

    async fn ledger(&self, user_id: i64) -> StoreResult<Option<LedgerSnapshot>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .context("set isolation level")?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let Some(user) = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("load user")?
        else {
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, PointEntry>(
            r#"
            SELECT id, user_id, point, description, created_at
              FROM points
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .context("list point entries")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(LedgerSnapshot { user, entries }))
    }

    async fn ranking(&self) -> StoreResult<Vec<RankingRow>> {
        let rows = sqlx::query_as::<_, RankingRow>(
            r#"
            SELECT name, nick_name, school_number, points
              FROM users
             ORDER BY points DESC, school_number ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("ranking")?;
        Ok(rows)
    }

    async fn menus_for(&self, restaurant_type: &str, date: Date) -> StoreResult<Vec<MenuRow>> {
        let rows = sqlx::query_as::<_, MenuRow>(
            r#"
            SELECT restaurant_type, day_of_week, meal_time, dishes, date
              FROM menus
             WHERE restaurant_type = $1 AND date = $2
             ORDER BY id
            "#,
        )
        .bind(restaurant_type)
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("menus for restaurant")?;
        Ok(rows)
    }
}
