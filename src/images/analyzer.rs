use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalyzerConfig;

/// Result of inspecting a tray photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Number of food sections that still hold leftovers (0..=5).
    pub left_section: u8,
    pub description: String,
}

#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image_url: &str) -> anyhow::Result<Analysis>;
}

/// Fixed answer, used until a real model is wired in.
#[derive(Debug, Clone)]
pub struct StubAnalyzer {
    left_section: u8,
    description: String,
}

impl StubAnalyzer {
    pub fn new(left_section: u8) -> Self {
        Self {
            left_section,
            description: "tray analysis (stub)".into(),
        }
    }
}

#[async_trait]
impl ImageAnalyzer for StubAnalyzer {
    async fn analyze(&self, image_url: &str) -> anyhow::Result<Analysis> {
        anyhow::ensure!(!image_url.is_empty(), "image url is required");
        debug!(image_url, left_section = self.left_section, "stub analysis");
        Ok(Analysis {
            left_section: self.left_section,
            description: self.description.clone(),
        })
    }
}

/// Remote analysis service: `POST {url}` with `{"imageUrl": ...}`, answers with
/// an [`Analysis`] body.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    image_url: &'a str,
}

impl HttpAnalyzer {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build analyzer http client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ImageAnalyzer for HttpAnalyzer {
    async fn analyze(&self, image_url: &str) -> anyhow::Result<Analysis> {
        anyhow::ensure!(!image_url.is_empty(), "image url is required");
        let analysis = self
            .client
            .post(&self.url)
            .json(&AnalyzeRequest { image_url })
            .send()
            .await
            .context("analyzer request")?
            .error_for_status()
            .context("analyzer status")?
            .json::<Analysis>()
            .await
            .context("analyzer response body")?;
        debug!(image_url, left_section = analysis.left_section, "remote analysis");
        Ok(analysis)
    }
}

/// Remote analyzer when `ANALYZER_URL` is set, otherwise the stub.
pub fn from_config(cfg: &AnalyzerConfig) -> anyhow::Result<std::sync::Arc<dyn ImageAnalyzer>> {
    Ok(match &cfg.url {
        Some(url) => std::sync::Arc::new(HttpAnalyzer::new(url.clone())?),
        None => std::sync::Arc::new(StubAnalyzer::new(cfg.stub_sections)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_returns_configured_sections() {
        let a = StubAnalyzer::new(2).analyze("https://x/y.png").await.unwrap();
        assert_eq!(a.left_section, 2);
        assert!(!a.description.is_empty());
    }

    #[tokio::test]
    async fn stub_requires_url() {
        assert!(StubAnalyzer::new(2).analyze("").await.is_err());
    }

    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/analyze")
    }

    #[tokio::test]
    async fn http_analyzer_posts_image_url_and_parses_reply() {
        use axum::{routing::post, Json};
        use serde_json::{json, Value};

        let url = serve(axum::Router::new().route(
            "/analyze",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"leftSection": 1, "description": body["imageUrl"]}))
            }),
        ))
        .await;

        let a = HttpAnalyzer::new(url).unwrap().analyze("https://x/y.png").await.unwrap();
        assert_eq!(a.left_section, 1);
        assert_eq!(a.description, "https://x/y.png");
    }

    #[tokio::test]
    async fn http_analyzer_fails_on_server_error() {
        use axum::{http::StatusCode, routing::post};

        let url = serve(axum::Router::new().route(
            "/analyze",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        ))
        .await;

        let err = HttpAnalyzer::new(url).unwrap().analyze("https://x/y.png").await.unwrap_err();
        assert!(format!("{err:#}").contains("analyzer status"));
    }

    #[tokio::test]
    async fn http_analyzer_fails_on_unexpected_body() {
        use axum::routing::post;

        let url = serve(axum::Router::new().route("/analyze", post(|| async { "not json" }))).await;

        let err = HttpAnalyzer::new(url).unwrap().analyze("https://x/y.png").await.unwrap_err();
        assert!(format!("{err:#}").contains("analyzer response body"));
    }

    #[test]
    fn analysis_wire_format() {
        let a: Analysis =
            serde_json::from_str(r#"{"leftSection":3,"description":"rice left"}"#).unwrap();
        assert_eq!(a.left_section, 3);
    }
}
