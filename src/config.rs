use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Cookie used to hand the access token to browsers after login.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCookieConfig {
    pub max_age_secs: i64,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base of the durable URLs handed to the analyzer, e.g.
    /// `https://bucket.s3.ap-northeast-2.amazonaws.com`.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub url: Option<String>,
    pub stub_sections: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub cookie: SessionCookieConfig,
    pub password_hash_cost: u32,
    pub storage: StorageConfig,
    pub analyzer: AnalyzerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "leftover".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "leftover-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        anyhow::ensure!(!jwt.secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let cookie = SessionCookieConfig {
            max_age_secs: parse_or("SESSION_COOKIE_MAX_AGE_SECS", 60 * 60),
            secure: parse_or("SESSION_COOKIE_SECURE", false),
        };

        let storage = StorageConfig {
            endpoint: std::env::var("S3_ENDPOINT")
                .unwrap_or_else(|_| "https://s3.amazonaws.com".into()),
            bucket: std::env::var("S3_BUCKET").unwrap_or_else(|_| "leftover".into()),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            access_key: std::env::var("S3_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("S3_SECRET_KEY").unwrap_or_default(),
            public_url: std::env::var("S3_PUBLIC_URL").unwrap_or_default(),
        };

        let analyzer = AnalyzerConfig {
            url: std::env::var("ANALYZER_URL").ok().filter(|v| !v.is_empty()),
            stub_sections: parse_or("ANALYZER_STUB_SECTIONS", 2),
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            db_timeout_secs: parse_or("DB_TIMEOUT_SECS", 5),
            jwt,
            cookie,
            password_hash_cost: parse_or("PASSWORD_HASH_COST", 10),
            storage,
            analyzer,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}
