use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub nick_name: String,
    pub school_number: String,         // natural key, unique
    #[serde(skip_serializing)]
    pub password_hash: String,         // Argon2 PHC string, never exposed in JSON
    pub points: i64,                   // cached ledger sum
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Insert payload for a freshly registered user.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub nick_name: &'a str,
    pub school_number: &'a str,
    pub password_hash: &'a str,
}
