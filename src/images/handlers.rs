use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::services::{delete_image, upload_and_score, UploadItem, UploadOutcome};
use crate::{auth::AuthUser, error::AppError, extract::AppJson, state::AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteImageRequest {
    pub file_key: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/image/upload", post(upload))
        .route("/image/delete", post(delete))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /image/upload (multipart, field `file`)
#[instrument(skip(state, auth, mp), fields(user_id = auth.user_id))]
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadOutcome>, AppError> {
    let mut mp = mp?;
    let mut file: Option<UploadItem> = None;
    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "malformed multipart body");
        AppError::validation("malformed multipart body")
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let file_name = field.file_name().unwrap_or_default().to_string();
        let body = field
            .bytes()
            .await
            .map_err(|_| AppError::validation("could not read uploaded file"))?;
        file = Some(UploadItem {
            body,
            content_type,
            file_name,
        });
        break;
    }

    let file = file.ok_or_else(|| AppError::validation("no file uploaded"))?;
    Ok(Json(upload_and_score(&state, auth.user_id, file).await?))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<DeleteImageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    delete_image(&state, &payload.file_key).await?;
    Ok(Json(MessageResponse {
        message: "image deleted",
    }))
}
