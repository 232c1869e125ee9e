use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::TokenPair,
    password,
    repo_types::{NewUser, User},
};
use crate::{error::AppError, state::AppState};

pub(crate) fn is_valid_school_number(school_number: &str) -> bool {
    lazy_static! {
        static ref SCHOOL_NUMBER_RE: Regex = Regex::new(r"^[0-9A-Za-z-]{1,32}$").unwrap();
    }
    SCHOOL_NUMBER_RE.is_match(school_number)
}

fn require(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("missing required field: {field}")));
    }
    Ok(())
}

/// Create a user with a salted hash of `password` and zero points.
pub async fn register(st: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    require("name", &req.name)?;
    require("nickName", &req.nick_name)?;
    require("schoolNumber", &req.school_number)?;
    require("password", &req.password)?;

    let school_number = req.school_number.trim();
    if !is_valid_school_number(school_number) {
        warn!(school_number, "malformed school number");
        return Err(AppError::validation("invalid schoolNumber"));
    }

    // The unique constraint still decides races.
    if st.store.find_user_by_school_number(school_number).await?.is_some() {
        warn!(school_number, "school number already registered");
        return Err(AppError::DuplicateKey("school number"));
    }

    let hash = password::hash_password_async(req.password, st.config.password_hash_cost)
        .await
        .map_err(AppError::Internal)?;

    let user = st
        .store
        .insert_user(NewUser {
            name: req.name.trim(),
            nick_name: req.nick_name.trim(),
            school_number,
            password_hash: &hash,
        })
        .await?;

    info!(user_id = user.id, school_number = %user.school_number, "user registered");
    Ok(user)
}

/// Check credentials and mint an access + refresh pair.
pub async fn login(st: &AppState, req: LoginRequest) -> Result<(User, TokenPair), AppError> {
    require("schoolNumber", &req.school_number)?;
    require("password", &req.password)?;
    let school_number = req.school_number.trim();

    let Some(user) = st.store.find_user_by_school_number(school_number).await? else {
        warn!(school_number, "login unknown school number");
        return Err(AppError::UnknownAccount);
    };

    let ok = password::verify_password_async(req.password, user.password_hash.clone())
        .await
        .map_err(AppError::Internal)?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Authentication);
    }

    let pair = st
        .keys
        .issue_pair(&user.school_number, user.id)
        .map_err(AppError::Internal)?;

    info!(user_id = user.id, school_number = %user.school_number, "user logged in");
    Ok((user, pair))
}

/// Exchange a valid refresh token for a fresh pair. Expired or forged tokens
/// are never renewed.
pub fn refresh(st: &AppState, refresh_token: &str) -> Result<TokenPair, AppError> {
    let claims = st.keys.verify_refresh(refresh_token)?;
    let pair = st
        .keys
        .issue_pair(&claims.sub, claims.uid)
        .map_err(AppError::Internal)?;
    info!(user_id = claims.uid, "tokens refreshed");
    Ok(pair)
}
