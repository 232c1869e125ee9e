//! `Json` and `Query` that reject with [`AppError`] instead of axum's own text.

use axum::{
    async_trait,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        debug!(status = %rej.status(), error = %rej.body_text(), "json body rejected");
        AppError::Validation(format!("invalid request body: {}", rej.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rej: QueryRejection) -> Self {
        debug!(error = %rej.body_text(), "query string rejected");
        AppError::Validation(format!("invalid query string: {}", rej.body_text()))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rej: MultipartRejection) -> Self {
        debug!(error = %rej.body_text(), "multipart body rejected");
        AppError::Validation(format!("invalid multipart body: {}", rej.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::StatusCode};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        point: i64,
    }

    fn json_request(body: &'static str, content_type: Option<&str>) -> Request {
        let mut b = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            b = b.header("content-type", ct);
        }
        b.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let err = AppJson::<Payload>::from_request(json_request("{not json", Some("application/json")), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrongly_typed_field_is_a_validation_error() {
        let req = json_request(r#"{"point":"ten"}"#, Some("application/json"));
        let err = AppJson::<Payload>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_validation_error() {
        let err = AppJson::<Payload>::from_request(json_request(r#"{"point":1}"#, None), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_query_value_is_a_validation_error() {
        let req = axum::http::Request::builder()
            .uri("/?point=abc")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let err = AppQuery::<Payload>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let req = json_request(r#"{"point":7}"#, Some("application/json"));
        let AppJson(p) = AppJson::<Payload>::from_request(req, &()).await.unwrap();
        assert_eq!(p.point, 7);
    }
}
