//! Object Store Publishing
//!
//! Images are uploaded under `{scheme}/v{major}/{name}-{hash}` and again
//! with the file extension appended.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;

use crate::manifest::ImageRecord;
use crate::pipeline::{Result, ToolError};

/// Minimal object store surface used by the publisher
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(false)` when nothing is stored under `key`
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Upload `file` publicly readable under `key`
    async fn upload(&self, key: &str, file: &Path, content_type: &str) -> Result<()>;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn from_credentials(
        access_key: &str,
        secret_key: &str,
        region: &str,
        bucket: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "imageset-tools");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();
        Self::new(Client::from_conf(config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(ToolError::ObjectStore {
                        key: key.to_string(),
                        message: DisplayErrorContext(&err).to_string(),
                    })
                }
            }
        }
    }

    async fn upload(&self, key: &str, file: &Path, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(file).await.map_err(|e| ToolError::ObjectStore {
            key: key.to_string(),
            message: format!("could not read {}: {e}", file.display()),
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|err| ToolError::ObjectStore {
                key: key.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;
        Ok(())
    }
}

/// The two keys an image is published under
pub fn publish_keys(image: &ImageRecord, versioned_path: &str) -> [String; 2] {
    let base = image.base_key(versioned_path);
    let with_extension = format!("{}.{}", base, image.extension);
    [base, with_extension]
}

pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}
