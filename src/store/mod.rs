//! Relational store behind a trait so the service can run against Postgres in
//! production and an in-process store in tests.

use async_trait::async_trait;
use thiserror::Error;
use time::Date;

use crate::{
    auth::repo_types::{NewUser, User},
    menu::repo_types::MenuRow,
    points::repo_types::{LedgerSnapshot, PointEntry, RankingRow},
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a user with `points = 0`. Fails with `Duplicate` when the
    /// school number is taken.
    async fn insert_user(&self, user: NewUser<'_>) -> StoreResult<User>;

    async fn find_user_by_school_number(&self, school_number: &str) -> StoreResult<Option<User>>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    /// Append a ledger entry and bump the cached total in one atomic unit.
    /// Fails with `NotFound` (and writes nothing) for an unknown user.
    async fn append_point(&self, user_id: i64, delta: i64, description: &str)
        -> StoreResult<PointEntry>;

    /// `None` when the user does not exist.
    async fn ledger(&self, user_id: i64) -> StoreResult<Option<LedgerSnapshot>>;

    /// All users, highest cached total first, ties by school number ascending.
    async fn ranking(&self) -> StoreResult<Vec<RankingRow>>;

    async fn menus_for(&self, restaurant_type: &str, date: Date) -> StoreResult<Vec<MenuRow>>;
}
