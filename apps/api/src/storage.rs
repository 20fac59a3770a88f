//! Object storage for uploaded CV files (S3 / MinIO).

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `body` under `key` and returns the URL clients can fetch it from.
    async fn put(&self, key: &str, body: Bytes, content_type: &str)
        -> Result<String, StorageError>;
}

pub struct S3FileStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: String,
}

impl S3FileStore {
    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn from_config(config: &Config) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "mentorly-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .load()
            .await;

        let public_url = config
            .s3_public_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", config.s3_endpoint, config.s3_bucket));

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_client_config(&s3_config)),
            bucket: config.s3_bucket.clone(),
            public_url,
        }
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(object_url(&self.public_url, key))
    }
}

/// S3 client settings on top of the shared AWS config. MinIO only serves
/// path-style URLs (`<endpoint>/<bucket>/<key>`).
pub fn s3_client_config(shared: &aws_config::SdkConfig) -> aws_sdk_s3::Config {
    aws_sdk_s3::config::Builder::from(shared)
        .force_path_style(true)
        .build()
}

pub fn object_url(public_url: &str, key: &str) -> String {
    format!("{}/{}", public_url.trim_end_matches('/'), key)
}

/// Object key for a user's CV upload. Only the final path segment of the
/// client-supplied file name is kept.
pub fn cv_object_key(user_id: &str, job_id: uuid::Uuid, file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("cv.pdf");
    format!("cvs/{user_id}/{job_id}-{base}")
}


#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_cv_object_key_strips_directories() {
        let id = Uuid::nil();
        assert_eq!(
            cv_object_key("u1", id, "../../etc/resume.pdf"),
            format!("cvs/u1/{id}-resume.pdf")
        );
        assert_eq!(
            cv_object_key("u1", id, "C:\\docs\\cv.pdf"),
            format!("cvs/u1/{id}-cv.pdf")
        );
        assert_eq!(cv_object_key("u1", id, ""), format!("cvs/u1/{id}-cv.pdf"));
    }

    #[test]
    fn test_client_config_builds_from_shared_config() {
        let shared = aws_config::SdkConfig::builder()
            .region(Region::new("us-east-1"))
            .endpoint_url("http://localhost:9000")
            .behavior_version(aws_config::BehaviorVersion::latest())
            .build();
        let config = s3_client_config(&shared);
        assert_eq!(config.region().map(|r| r.as_ref()), Some("us-east-1"));
        // constructing the client must not panic on the path-style config
        let _client = aws_sdk_s3::Client::from_conf(config);
    }

    #[test]
    fn test_object_url_joins_without_double_slash() {
        assert_eq!(
            object_url("https://cdn.test/bucket/", "cvs/a.pdf"),
            "https://cdn.test/bucket/cvs/a.pdf"
        );
    }
}
