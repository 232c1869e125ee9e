use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::analyzer::Analysis;
use crate::{
    error::AppError,
    points::{
        repo_types::PointEntry,
        services::{add_entry, score_for_leftover},
    },
    state::AppState,
};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_key: String,
    pub url: String,
    pub analysis: Analysis,
    pub points: i64,
    /// Absent when the photo scores zero points.
    pub entry: Option<PointEntry>,
}

/// Store the photo, have it analysed and award the resulting points.
pub async fn upload_and_score(
    st: &AppState,
    user_id: i64,
    img: UploadItem,
) -> Result<UploadOutcome, AppError> {
    if img.body.is_empty() {
        return Err(AppError::validation("uploaded file is empty"));
    }
    let Some(ext) = ext_from_mime(&img.content_type) else {
        warn!(content_type = %img.content_type, "unsupported upload type");
        return Err(AppError::validation("unsupported image type"));
    };

    let key = object_key(&img.file_name, ext, OffsetDateTime::now_utc(), Uuid::new_v4());
    let url = st
        .storage
        .put_object(&key, img.body, &img.content_type)
        .await
        .map_err(AppError::Upstream)?;
    info!(user_id, key = %key, "image stored");

    match score_and_award(st, user_id, &url).await {
        Ok((analysis, points, entry)) => Ok(UploadOutcome {
            file_key: key,
            url,
            analysis,
            points,
            entry,
        }),
        Err(e) => {
            // The key never reaches the caller on failure.
            if let Err(del) = st.storage.delete_object(&key).await {
                warn!(key = %key, error = ?del, "failed to remove orphaned image");
            } else {
                info!(key = %key, "orphaned image removed");
            }
            Err(e)
        }
    }
}

async fn score_and_award(
    st: &AppState,
    user_id: i64,
    url: &str,
) -> Result<(Analysis, i64, Option<PointEntry>), AppError> {
    let analysis = st.analyzer.analyze(url).await.map_err(AppError::Upstream)?;
    let points = score_for_leftover(analysis.left_section)?;

    let entry = if points != 0 {
        let reason = format!("leftover analysis: {}", analysis.description);
        Some(add_entry(st, user_id, points, &reason).await?)
    } else {
        None
    };

    info!(user_id, left_section = analysis.left_section, points, "image scored");
    Ok((analysis, points, entry))
}

pub async fn delete_image(st: &AppState, file_key: &str) -> Result<(), AppError> {
    let file_key = file_key.trim();
    if file_key.is_empty() {
        return Err(AppError::validation("missing required field: fileKey"));
    }
    st.storage
        .delete_object(file_key)
        .await
        .map_err(AppError::Upstream)?;
    info!(key = %file_key, "image deleted");
    Ok(())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// `<unix-millis>_<uuid>_<name>`; the name keeps only URL-safe characters.
fn object_key(file_name: &str, ext: &str, now: OffsetDateTime, id: Uuid) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let safe: String = file_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let name = if safe.trim_matches('.').is_empty() {
        format!("upload.{ext}")
    } else {
        safe
    };
    format!("{millis}_{id}_{name}")
}

#[cfg(test)]
mod image_tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::auth::repo_types::NewUser;
    use crate::images::analyzer::ImageAnalyzer;
    use crate::storage::StorageClient;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[test]
    fn object_key_is_prefixed_and_sanitised() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let id = Uuid::nil();
        let key = object_key("../tray 1.png", "png", now, id);
        assert_eq!(key, format!("1700000000000_{id}_..tray1.png"));
        assert_eq!(
            object_key("식판.png", "png", now, id),
            format!("1700000000000_{id}_.png")
        );
        assert_eq!(
            object_key("", "jpg", now, id),
            format!("1700000000000_{id}_upload.jpg")
        );
    }

    async fn seed(st: &AppState) -> i64 {
        st.store
            .insert_user(NewUser {
                name: "Kim",
                nick_name: "k1",
                school_number: "2021001",
                password_hash: "$argon2id$fake",
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn upload_awards_points_for_stub_analysis() {
        let st = AppState::fake();
        let uid = seed(&st).await;
        let out = upload_and_score(
            &st,
            uid,
            UploadItem {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
                file_name: "tray.png".into(),
            },
        )
        .await
        .unwrap();

        // fake() analyses every tray as two sections left.
        assert_eq!(out.analysis.left_section, 2);
        assert_eq!(out.points, 10);
        assert!(out.url.ends_with(&out.file_key));
        let entry = out.entry.expect("entry recorded");
        assert_eq!(entry.point, 10);
        assert_eq!(st.store.find_user(uid).await.unwrap().unwrap().points, 10);
    }

    #[tokio::test]
    async fn non_image_upload_rejected() {
        let st = AppState::fake();
        let uid = seed(&st).await;
        let err = upload_and_score(
            &st,
            uid,
            UploadItem {
                body: Bytes::from_static(b"hello"),
                content_type: "text/plain".into(),
                file_name: "a.txt".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[derive(Default)]
    struct CountingStorage {
        live: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl StorageClient for CountingStorage {
        async fn put_object(&self, key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<String> {
            self.live.lock().unwrap().insert(key.to_string());
            Ok(format!("https://fake.local/{key}"))
        }
        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.live.lock().unwrap().remove(key);
            Ok(())
        }
    }

    struct FixedAnalyzer(anyhow::Result<u8>);

    #[async_trait]
    impl ImageAnalyzer for FixedAnalyzer {
        async fn analyze(&self, _image_url: &str) -> anyhow::Result<Analysis> {
            match &self.0 {
                Ok(n) => Ok(Analysis {
                    left_section: *n,
                    description: "fixed".into(),
                }),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    fn with_parts(storage: Arc<CountingStorage>, analyzer: FixedAnalyzer) -> AppState {
        AppState {
            storage,
            analyzer: Arc::new(analyzer),
            ..AppState::fake()
        }
    }

    fn png() -> UploadItem {
        UploadItem {
            body: Bytes::from_static(b"\x89PNG"),
            content_type: "image/png".into(),
            file_name: "tray.png".into(),
        }
    }

    #[tokio::test]
    async fn out_of_range_analysis_removes_stored_image() {
        let storage = Arc::new(CountingStorage::default());
        let st = with_parts(storage.clone(), FixedAnalyzer(Ok(9)));
        let uid = seed(&st).await;

        let err = upload_and_score(&st, uid, png()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(storage.live.lock().unwrap().is_empty());
        assert!(st.store.ledger(uid).await.unwrap().unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn analyzer_failure_removes_stored_image() {
        let storage = Arc::new(CountingStorage::default());
        let st = with_parts(storage.clone(), FixedAnalyzer(Err(anyhow::anyhow!("model down"))));
        let uid = seed(&st).await;

        let err = upload_and_score(&st, uid, png()).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(storage.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn award_failure_removes_stored_image() {
        let storage = Arc::new(CountingStorage::default());
        let st = with_parts(storage.clone(), FixedAnalyzer(Ok(1)));

        // No such user, so the award step fails after the upload.
        let err = upload_and_score(&st, 999, png()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(storage.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_upload_keeps_stored_image() {
        let storage = Arc::new(CountingStorage::default());
        let st = with_parts(storage.clone(), FixedAnalyzer(Ok(0)));
        let uid = seed(&st).await;

        let out = upload_and_score(&st, uid, png()).await.unwrap();
        assert_eq!(out.points, 20);
        assert!(storage.live.lock().unwrap().contains(&out.file_key));
    }

    #[tokio::test]
    async fn delete_requires_key() {
        let st = AppState::fake();
        assert!(matches!(delete_image(&st, " ").await, Err(AppError::Validation(_))));
        assert!(delete_image(&st, "k.png").await.is_ok());
    }
}
