use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{config::SessionCookieConfig, error::AppError};

pub const SESSION_COOKIE_NAME: &str = "token";

/// Caller identity taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub school_number: String,
}

/// Locate the session token on a request.
///
/// Precedence: an `Authorization: Bearer <token>` header wins; only when it is
/// absent (or uses another scheme) is the `token` cookie consulted.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == SESSION_COOKIE_NAME)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `HttpOnly` cookie carrying the access token.
pub fn session_cookie(cfg: &SessionCookieConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        cfg.max_age_secs
    );
    if cfg.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_session_cookie(cfg: &SessionCookieConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if cfg.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            warn!(uri = %parts.uri, "request without session token");
            return Err(AppError::MissingToken);
        };

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(&token).map_err(|e| {
            warn!(uri = %parts.uri, "invalid or expired token");
            e
        })?;

        Ok(AuthUser {
            user_id: claims.uid,
            school_number: claims.sub,
        })
    }
}
