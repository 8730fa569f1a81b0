use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use reqwest::Client;
use tracing::{info, warn};

use crate::providers::{AssetMirror, ObjectStorage, ProviderError};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// S3 / MinIO object storage. Objects are addressed publicly as
/// `{public_base}/{key}`.
#[derive(Clone)]
pub struct S3Storage {
    s3: aws_sdk_s3::Client,
    http: Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    pub fn new(s3: aws_sdk_s3::Client, http: Client, bucket: String, public_base: String) -> Self {
        Self {
            s3,
            http,
            bucket,
            public_base,
        }
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.public_base, key)
    }

    async fn download(&self, url: &str) -> Result<(Bytes, String), ProviderError> {
        let response = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| guess_content_type(url).to_string());
        Ok((response.bytes().await?, content_type))
    }
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Content type from the URL's file extension, ignoring any query string.
pub fn guess_content_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn store(
        &self,
        data: Bytes,
        key: &str,
        content_type: &str,
    ) -> Result<String, ProviderError> {
        let size = data.len();
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| ProviderError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(self.public_url(key))
    }
}

#[async_trait]
impl AssetMirror for S3Storage {
    async fn mirror(&self, url: &str, key: &str) -> String {
        let stored = async {
            let (data, content_type) = self.download(url).await?;
            self.store(data, key, &content_type).await
        }
        .await;

        match stored {
            Ok(permanent) => permanent,
            Err(e) => {
                warn!("Could not mirror {url} to storage, keeping provider URL: {e}");
                url.to_string()
            }
        }
    }
}
