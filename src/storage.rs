use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// Object storage for uploaded tray photos.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store `body` under `key` and return its durable URL.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        let public_url = if cfg.public_url.is_empty() {
            format!("{}/{}", cfg.endpoint.trim_end_matches('/'), cfg.bucket)
        } else {
            cfg.public_url.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url,
        })
    }

    fn object_url(&self, key: &str) -> String {
        object_url(&self.public_url, key)
    }
}

pub(crate) fn object_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(self.object_url(key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn object_url_joins_without_double_slash() {
        assert_eq!(
            super::object_url("https://b.s3.ap-northeast-2.amazonaws.com/", "k.png"),
            "https://b.s3.ap-northeast-2.amazonaws.com/k.png"
        );
    }
}
