//! Image Set Pipeline - Single Entry Point
//!
//! Every operation builds a fresh manifest from disk. Nothing is cached
//! between calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use thiserror::Error;

use crate::config::ToolConfig;
use crate::hashing::hash_file;
use crate::manifest::{list_image_files, to_tab_json, ImageRecord, ImageSetManifest, LegacyManifest};
use crate::publish::{content_type, publish_keys, ObjectStore, S3ObjectStore};
use crate::purge::{PurgeClient, API_KEY_HEADER};
use crate::report::{Reporter, TracingReporter};
use crate::validation::SvgVerifier;
use crate::{LEGACY_MANIFEST_FILE, MANIFEST_FILE};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("No AWS credentials are available")]
    MissingAwsCredentials,

    #[error("No S3 bucket was given")]
    MissingBucket,

    #[error("No image service API key is available")]
    MissingImageServiceApiKey,

    #[error("Invalid host {host:?}: {message}")]
    InvalidHost { host: String, message: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {} as JSON: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not parse {} as XML: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Verification errors in {}: {}", path.display(), messages.join("; "))]
    Verification { path: PathBuf, messages: Vec<String> },

    #[error("Purge request to {url} failed: {source}")]
    Purge {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Object store error for key {key:?}: {message}")]
    ObjectStore { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, ToolError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ToolError + '_ {
    move |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The image set tool chain
pub struct ImageSetTools {
    config: ToolConfig,
    reporter: Arc<dyn Reporter>,
    verifier: SvgVerifier,
}

impl ImageSetTools {
    pub fn new(config: ToolConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config,
            reporter,
            verifier: SvgVerifier::new(),
        }
    }

    pub fn with_verifier(mut self, verifier: SvgVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.base_directory.join(MANIFEST_FILE)
    }

    pub fn legacy_manifest_path(&self) -> PathBuf {
        self.config.base_directory.join(LEGACY_MANIFEST_FILE)
    }

    /// Scan the source directory and describe every image in it.
    ///
    /// Hashes, previous hashes and deprecation notes are diffed against
    /// whatever manifest is currently on disk.
    pub async fn build_manifest(&self) -> Result<ImageSetManifest> {
        let current = self.read_manifest().await?;
        let source_path = self.config.source_path();
        let files = list_image_files(&source_path)
            .await
            .map_err(io_error(&source_path))?;

        let versioned_path = self.config.versioned_path();
        let mut images = Vec::with_capacity(files.len());

        for (file, full_path) in files {
            let hash = hash_file(&full_path).await.map_err(io_error(&full_path))?;
            let mut image = ImageRecord {
                name: file.name.clone(),
                extension: file.extension.as_str().to_string(),
                path: file.relative_path(&self.config.source_directory),
                hash,
                ..Default::default()
            };

            if let Some(previous) = current
                .as_ref()
                .and_then(|m| m.find_image(&image.name, &image.extension, &image.path))
            {
                image.previous_hash = Some(previous.hash.clone());
                image.deprecated = previous.deprecated.clone();
            }

            if let Some(host) = &self.config.host {
                image.url = Some(image_url(host, &image.base_key(&versioned_path))?);
            }

            images.push(image);
        }

        Ok(ImageSetManifest {
            source_directory: self.config.source_directory.clone(),
            scheme: self.config.scheme.clone(),
            version: self.config.version.to_string(),
            host: self.config.host.clone(),
            images,
        })
    }

    pub async fn build_legacy_manifest(&self) -> Result<LegacyManifest> {
        Ok(self.build_manifest().await?.to_legacy())
    }

    /// Build the manifest and save it as `imageset.json`
    pub async fn build_manifest_file(&self) -> Result<()> {
        self.reporter.info("Building manifest file…");
        let result = async {
            let manifest = self.build_manifest().await?;
            self.write_json(&self.manifest_path(), &manifest).await
        }
        .await;

        match result {
            Ok(()) => {
                self.reporter.info("✔ Manifest file saved");
                Ok(())
            }
            Err(e) => {
                self.reporter.error("✘ Manifest file could not be saved");
                Err(e)
            }
        }
    }

    /// Build the name-only manifest and save it as `imageList.json`
    pub async fn build_legacy_manifest_file(&self) -> Result<()> {
        self.reporter.info("Building legacy manifest file…");
        let result = async {
            let manifest = self.build_legacy_manifest().await?;
            self.write_json(&self.legacy_manifest_path(), &manifest).await
        }
        .await;

        match result {
            Ok(()) => {
                self.reporter.info("✔ Legacy manifest file saved");
                Ok(())
            }
            Err(e) => {
                self.reporter.error("✘ Legacy manifest file could not be saved");
                Err(e)
            }
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let contents = to_tab_json(value)?;
        tokio::fs::write(path, contents).await.map_err(io_error(path))
    }

    /// Read the manifest on disk, preferring `imageset.json` over `imageList.json`
    pub async fn read_manifest(&self) -> Result<Option<ImageSetManifest>> {
        let primary = self.manifest_path();
        let legacy = self.legacy_manifest_path();

        let path = if file_exists(&primary).await? {
            primary
        } else if file_exists(&legacy).await? {
            legacy
        } else {
            return Ok(None);
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(io_error(&path))?;
        serde_json::from_str::<Option<ImageSetManifest>>(&contents).map_err(|source| {
            self.reporter.error("✘ Error reading manifest file as JSON");
            ToolError::ManifestParse { path, source }
        })
    }

    /// Images whose hash changed since the manifest on disk was built
    pub async fn find_updated_images(&self) -> Result<Vec<ImageRecord>> {
        Ok(self
            .read_manifest()
            .await?
            .map(|m| m.updated_images())
            .unwrap_or_default())
    }

    /// Publish every image to the configured S3 bucket.
    ///
    /// Credentials are checked before the bucket, and both before any I/O.
    pub async fn publish_to_s3(&self) -> Result<()> {
        let access_key = self
            .config
            .aws_access_key
            .as_deref()
            .ok_or(ToolError::MissingAwsCredentials)?;
        let bucket = self
            .config
            .aws_bucket
            .as_deref()
            .ok_or(ToolError::MissingBucket)?;
        let secret_key = self.config.aws_secret_key.as_deref().unwrap_or_default();
        let store =
            S3ObjectStore::from_credentials(access_key, secret_key, &self.config.aws_region, bucket);
        self.publish(&store).await
    }

    /// Publish every image to `store`, one image at a time.
    ///
    /// Keys that already exist are skipped. The first failure stops the run.
    pub async fn publish(&self, store: &dyn ObjectStore) -> Result<()> {
        let manifest = self.build_manifest().await?;
        let versioned_path = self.config.versioned_path();

        for image in &manifest.images {
            let full_path = self.config.base_directory.join(&image.path);
            let mime = content_type(&full_path);
            self.reporter.info(&format!("Publishing \"{}\" to S3…", image.path));

            for key in publish_keys(image, &versioned_path) {
                if let Err(e) = self.publish_one(store, image, &key, &full_path, &mime).await {
                    self.reporter
                        .error(&format!("✘ File \"{}\" could not be published", image.path));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn publish_one(
        &self,
        store: &dyn ObjectStore,
        image: &ImageRecord,
        key: &str,
        full_path: &Path,
        mime: &str,
    ) -> Result<()> {
        if store.exists(key).await? {
            self.reporter.info(&format!(
                "✔ Already published \"{}\" to S3 under \"{}\"",
                image.path, key
            ));
        } else {
            store.upload(key, full_path, mime).await?;
            self.reporter
                .info(&format!("✔ Published \"{}\" to S3 under \"{}\"", image.path, key));
        }
        Ok(())
    }

    /// Purge every updated image from the image service
    pub async fn purge(&self) -> Result<()> {
        let api_key = self
            .config
            .image_service_api_key
            .as_deref()
            .ok_or(ToolError::MissingImageServiceApiKey)?;
        let client = PurgeClient::new(&self.config.image_service_url, api_key);

        let images = self.find_updated_images().await?;
        let versioned_scheme = self.config.versioned_scheme();

        try_join_all(
            images
                .iter()
                .map(|image| self.purge_image(&client, &versioned_scheme, image)),
        )
        .await?;
        Ok(())
    }

    async fn purge_image(
        &self,
        client: &PurgeClient,
        versioned_scheme: &str,
        image: &ImageRecord,
    ) -> Result<()> {
        let identifier = format!("{}:{}", versioned_scheme, image.name);
        let identifier_ext = format!("{}.{}", identifier, image.extension);

        self.reporter
            .info(&format!("Scheduling \"{}\" to be purged", image.path));

        match tokio::try_join!(client.purge(&identifier), client.purge(&identifier_ext)) {
            Ok(_) => {
                for id in [&identifier, &identifier_ext] {
                    self.reporter.info(&format!(
                        "✔ Scheduled purging of \"{}\" from \"{}\"",
                        id,
                        client.service_url()
                    ));
                }
                Ok(())
            }
            Err(e) => {
                let attempted = match &e {
                    ToolError::Purge { url, .. } => url.clone(),
                    _ => client.purge_url(&identifier),
                };
                self.reporter.error(&format!(
                    "✘ Could not schedule purge of \"{}\" \"{}\" from \"{}\" using GET {} with header {}",
                    identifier,
                    identifier_ext,
                    client.service_url(),
                    attempted,
                    API_KEY_HEADER
                ));
                Err(e)
            }
        }
    }

    /// Verify all images, logging a summary line on success
    pub async fn verify_images(&self) -> Result<()> {
        self.reporter.info("Verifying images…");
        self.verify_svg_images().await?;
        self.reporter.info("✔ Verified all images");
        Ok(())
    }

    /// Check every SVG in the set. All files are checked before the first
    /// failure is returned.
    pub async fn verify_svg_images(&self) -> Result<()> {
        let manifest = self.build_manifest().await?;
        let results = join_all(
            manifest
                .images
                .iter()
                .filter(|image| image.is_svg())
                .map(|image| self.verify_svg(image)),
        )
        .await;

        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    async fn verify_svg(&self, image: &ImageRecord) -> Result<()> {
        let full_path = self.config.base_directory.join(&image.path);
        self.reporter.info(&format!("Verifying \"{}\"…", image.path));

        let result = self.check_svg_file(&full_path).await;
        match &result {
            Ok(()) => self
                .reporter
                .info(&format!("✔ File \"{}\" has no issues", image.path)),
            Err(e) => {
                self.reporter
                    .error(&format!("✘ File \"{}\" has some issues:", image.path));
                match e {
                    ToolError::Verification { messages, .. } => {
                        for message in messages {
                            self.reporter.error(&format!("  - {message}"));
                        }
                    }
                    other => self.reporter.error(&format!("  - {other}")),
                }
            }
        }
        result
    }

    async fn check_svg_file(&self, path: &Path) -> Result<()> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(io_error(path))?;
        let violations = self
            .verifier
            .verify(&contents)
            .map_err(|source| ToolError::Xml {
                path: path.to_path_buf(),
                source,
            })?;

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ToolError::Verification {
                path: path.to_path_buf(),
                messages: violations.into_iter().map(|v| v.message).collect(),
            })
        }
    }
}

impl Default for ImageSetTools {
    fn default() -> Self {
        Self::new(ToolConfig::default(), Arc::new(TracingReporter))
    }
}

async fn file_exists(path: &Path) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ToolError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Resolve `relative` against `host` the way a browser resolves a link
fn image_url(host: &str, relative: &str) -> Result<String> {
    let invalid = |message: String| ToolError::InvalidHost {
        host: host.to_string(),
        message,
    };
    let base = reqwest::Url::parse(host).map_err(|e| invalid(e.to_string()))?;
    let url = base.join(relative).map_err(|e| invalid(e.to_string()))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_joins_against_host() {
        assert_eq!(
            image_url("https://www.ft.com", "noscheme/v0/a-1").unwrap(),
            "https://www.ft.com/noscheme/v0/a-1"
        );
        assert_eq!(
            image_url("https://cdn.example.com/images/", "s/v2/a-1").unwrap(),
            "https://cdn.example.com/images/s/v2/a-1"
        );
    }

    #[test]
    fn test_image_url_rejects_relative_host() {
        assert!(matches!(
            image_url("not a url", "s/v0/a"),
            Err(ToolError::InvalidHost { .. })
        ));
    }

    #[test]
    fn test_verification_error_message() {
        let err = ToolError::Verification {
            path: PathBuf::from("src/a.svg"),
            messages: vec!["one".into(), "two".into()],
        };
        assert_eq!(err.to_string(), "Verification errors in src/a.svg: one; two");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_io() {
        let tools = ImageSetTools::new(
            ToolConfig::from_options(crate::ToolOptions {
                base_directory: Some(PathBuf::from("/definitely/not/here")),
                ..Default::default()
            }),
            Arc::new(crate::NoopReporter),
        );
        assert!(matches!(
            tools.purge().await,
            Err(ToolError::MissingImageServiceApiKey)
        ));
        assert!(matches!(
            tools.publish_to_s3().await,
            Err(ToolError::MissingAwsCredentials)
        ));
    }

    #[tokio::test]
    async fn test_missing_bucket_fails_before_io() {
        let tools = ImageSetTools::new(
            ToolConfig::from_options(crate::ToolOptions {
                base_directory: Some(PathBuf::from("/definitely/not/here")),
                aws_access_key: Some("AKID".into()),
                aws_secret_key: Some("secret".into()),
                ..Default::default()
            }),
            Arc::new(crate::NoopReporter),
        );
        assert_eq!(tools.config().aws_access_key.as_deref(), Some("AKID"));
        assert!(matches!(
            tools.publish_to_s3().await,
            Err(ToolError::MissingBucket)
        ));
    }
}
