use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AddPointRequest, AddPointResponse, HistoryQuery, HistoryResponse},
    repo_types::RankingRow,
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{AppJson, AppQuery},
    state::AppState,
};

pub fn point_routes() -> Router<AppState> {
    Router::new().route("/point/add", post(add_point))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/point", get(get_history))
        .route("/user/rank", get(get_ranking))
}

#[instrument(skip(state, auth, payload), fields(caller = auth.user_id))]
pub async fn add_point(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<AddPointRequest>,
) -> Result<Json<AddPointResponse>, AppError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::validation("missing required field: userId"))?;
    let delta = payload
        .point
        .ok_or_else(|| AppError::validation("missing required field: point"))?;
    let description = payload.description.unwrap_or_default();

    let entry = services::add_entry(&state, user_id, delta, &description).await?;
    Ok(Json(AddPointResponse {
        message: "point added",
        entry,
    }))
}

#[instrument(skip(state, auth), fields(caller = auth.user_id))]
pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(q): AppQuery<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let user_id = q
        .user_id
        .ok_or_else(|| AppError::validation("missing required query parameter: userId"))?;
    Ok(Json(services::history(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_ranking(State(state): State<AppState>) -> Result<Json<Vec<RankingRow>>, AppError> {
    Ok(Json(services::ranking(&state).await?))
}
