use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::{path::Path, sync::Arc, time::Duration};
use uuid::Uuid;

/// Prefix of every attachment object key.
pub const ATTACHMENT_PREFIX: &str = "resources/";

/// Attachment formats a resource may carry.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "csv"];

/// Lifetime of a presigned upload URL.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// AttachmentStorage
///
/// Object storage for resource attachments. Clients upload the file bytes
/// directly to the bucket with a presigned URL; the server only hands out
/// URLs and later records the key on the resource.
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Creates the bucket if it is missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Returns a PUT URL for `key`, pinned to `content_type` and valid for
    /// [`UPLOAD_URL_TTL`].
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, String>;
}

pub type StorageState = Arc<dyn AttachmentStorage>;

/// attachment_key_for
///
/// Derives a fresh object key from a client filename, or `None` when the
/// extension is not one of [`ALLOWED_EXTENSIONS`]. The filename itself never
/// reaches the key, only its lower-cased extension.
pub fn attachment_key_for(filename: &str) -> Option<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)?;
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    Some(format!("{ATTACHMENT_PREFIX}{}.{extension}", Uuid::new_v4()))
}

/// True when `key` has the exact shape produced by [`attachment_key_for`].
pub fn is_attachment_key(key: &str) -> bool {
    let Some(name) = key.strip_prefix(ATTACHMENT_PREFIX) else {
        return false;
    };
    let Some((stem, extension)) = name.rsplit_once('.') else {
        return false;
    };
    Uuid::parse_str(stem).is_ok() && ALLOWED_EXTENSIONS.contains(&extension)
}

/// S3AttachmentStorage
///
/// S3-compatible client (MinIO locally). Path-style addressing is forced
/// because MinIO does not serve virtual-hosted buckets.
#[derive(Clone)]
pub struct S3AttachmentStorage {
    client: s3::Client,
    bucket: String,
}

impl S3AttachmentStorage {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl AttachmentStorage for S3AttachmentStorage {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket on an existing bucket fails harmlessly.
        if let Err(e) = self.client.create_bucket().bucket(&self.bucket).send().await {
            tracing::debug!("create_bucket({}) skipped: {:?}", self.bucket, e);
        }
    }

    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(request.uri().to_string())
    }
}

/// MockAttachmentStorage
///
/// In-process stand-in used by tests and by the e2e router tests. Produces
/// deterministic URLs and can be told to fail.
#[derive(Clone, Default)]
pub struct MockAttachmentStorage {
    pub should_fail: bool,
}

impl MockAttachmentStorage {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl AttachmentStorage for MockAttachmentStorage {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_upload(&self, key: &str, _content_type: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("mock storage failure".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{key}?X-Amz-Expires={}",
            UPLOAD_URL_TTL.as_secs()
        ))
    }
}
