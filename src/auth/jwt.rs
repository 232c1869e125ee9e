use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Freshly minted access + refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }

    /// Sign a token as if issued at `now`; `exp` is exactly `now + ttl`.
    pub fn sign_at(
        &self,
        school_number: &str,
        user_id: i64,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: school_number.to_string(),
            uid: user_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, school_number: &str, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(school_number, user_id, TokenKind::Access, OffsetDateTime::now_utc())
    }

    pub fn sign_refresh(&self, school_number: &str, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(school_number, user_id, TokenKind::Refresh, OffsetDateTime::now_utc())
    }

    pub fn issue_pair(&self, school_number: &str, user_id: i64) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign_access(school_number, user_id)?,
            refresh_token: self.sign_refresh(school_number, user_id)?,
        })
    }

    /// Check signature, algorithm, issuer, audience and expiry. Pure: no I/O.
    /// A token is valid strictly before `exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        // jsonwebtoken still accepts `exp == now`; the token is dead from that second on.
        if data.claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            debug!(user_id = data.claims.uid, exp = data.claims.exp, "jwt expired");
            return Err(AppError::InvalidToken);
        }
        debug!(user_id = data.claims.uid, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            debug!(user_id = claims.uid, "refresh token presented as access token");
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            debug!(user_id = claims.uid, "access token presented as refresh token");
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}
