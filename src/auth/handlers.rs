use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use super::{
    dto::{
        LoginRequest, LoginResponse, PublicUser, RefreshRequest, RegisterRequest,
        RegisterResponse, TokenResponse,
    },
    extractors::{clear_session_cookie, session_cookie, AuthUser},
    services,
};
use crate::{error::AppError, extract::AppJson, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registered",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    let (user, pair) = services::login(&state, payload).await?;

    let mut headers = HeaderMap::new();
    match session_cookie(&state.config.cookie, &pair.access_token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(e) => error!(error = %e, "session cookie not representable"),
    }

    Ok((
        headers,
        Json(LoginResponse {
            message: "logged in",
            token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let pair = services::refresh(&state, &payload.refresh_token)?;
    Ok(Json(TokenResponse {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Tokens are stateless; logging out only drops the browser cookie.
pub async fn logout(State(state): State<AppState>) -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&state.config.cookie) {
        headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, headers)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(user.into()))
}
