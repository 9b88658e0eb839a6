//! Tool Configuration
//!
//! `ToolOptions` is what callers supply; `ToolConfig` is the resolved,
//! immutable view every operation reads from.

use std::path::PathBuf;

use semver::Version;

pub const DEFAULT_SCHEME: &str = "noscheme";
pub const DEFAULT_SOURCE_DIRECTORY: &str = "src";
pub const DEFAULT_VERSION: &str = "v0.0.0";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_IMAGE_SERVICE_URL: &str = "https://www.ft.com/__origami/service/image";

/// Caller supplied options. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct ToolOptions {
    pub base_directory: Option<PathBuf>,
    pub source_directory: Option<String>,
    pub scheme: Option<String>,
    pub version: Option<String>,
    pub host: Option<String>,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
    pub aws_region: Option<String>,
    pub aws_bucket: Option<String>,
    pub image_service_api_key: Option<String>,
    pub image_service_url: Option<String>,
}

impl ToolOptions {
    /// The default option set
    pub fn defaults() -> Self {
        Self {
            base_directory: Some(PathBuf::from(".")),
            source_directory: Some(DEFAULT_SOURCE_DIRECTORY.to_string()),
            scheme: Some(DEFAULT_SCHEME.to_string()),
            version: Some(DEFAULT_VERSION.to_string()),
            host: None,
            aws_access_key: None,
            aws_secret_key: None,
            aws_region: Some(DEFAULT_AWS_REGION.to_string()),
            aws_bucket: None,
            image_service_api_key: None,
            image_service_url: Some(DEFAULT_IMAGE_SERVICE_URL.to_string()),
        }
    }

    /// Fields set on `self` win over `fallback`
    pub fn merged_over(self, fallback: ToolOptions) -> ToolOptions {
        ToolOptions {
            base_directory: self.base_directory.or(fallback.base_directory),
            source_directory: self.source_directory.or(fallback.source_directory),
            scheme: self.scheme.or(fallback.scheme),
            version: self.version.or(fallback.version),
            host: self.host.or(fallback.host),
            aws_access_key: self.aws_access_key.or(fallback.aws_access_key),
            aws_secret_key: self.aws_secret_key.or(fallback.aws_secret_key),
            aws_region: self.aws_region.or(fallback.aws_region),
            aws_bucket: self.aws_bucket.or(fallback.aws_bucket),
            image_service_api_key: self.image_service_api_key.or(fallback.image_service_api_key),
            image_service_url: self.image_service_url.or(fallback.image_service_url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub base_directory: PathBuf,
    pub source_directory: String,
    pub scheme: String,
    pub version: Version,
    pub host: Option<String>,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
    pub aws_region: String,
    pub aws_bucket: Option<String>,
    pub image_service_api_key: Option<String>,
    pub image_service_url: String,
}

impl ToolConfig {
    /// Resolve options against the defaults.
    ///
    /// Empty strings count as unset, matching how the CLI passes through
    /// blank environment variables.
    pub fn from_options(options: ToolOptions) -> Self {
        let merged = drop_blank(options).merged_over(ToolOptions::defaults());
        Self {
            base_directory: merged.base_directory.unwrap_or_else(|| PathBuf::from(".")),
            source_directory: merged
                .source_directory
                .unwrap_or_else(|| DEFAULT_SOURCE_DIRECTORY.to_string()),
            scheme: merged.scheme.unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
            version: normalize_version(merged.version.as_deref().unwrap_or(DEFAULT_VERSION)),
            host: merged.host,
            aws_access_key: merged.aws_access_key,
            aws_secret_key: merged.aws_secret_key,
            aws_region: merged.aws_region.unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            aws_bucket: merged.aws_bucket,
            image_service_api_key: merged.image_service_api_key,
            image_service_url: merged
                .image_service_url
                .unwrap_or_else(|| DEFAULT_IMAGE_SERVICE_URL.to_string()),
        }
    }

    /// `{scheme}/v{major}`, the prefix shared by object keys and image URLs
    pub fn versioned_path(&self) -> String {
        format!("{}/v{}", self.scheme, self.version.major)
    }

    /// `{scheme}-v{major}`, the namespace the image service knows the set by
    pub fn versioned_scheme(&self) -> String {
        format!("{}-v{}", self.scheme, self.version.major)
    }

    pub fn source_path(&self) -> PathBuf {
        self.base_directory.join(&self.source_directory)
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self::from_options(ToolOptions::default())
    }
}

fn drop_blank(options: ToolOptions) -> ToolOptions {
    let keep = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    ToolOptions {
        base_directory: options.base_directory,
        source_directory: keep(options.source_directory),
        scheme: keep(options.scheme),
        version: keep(options.version),
        host: keep(options.host),
        aws_access_key: keep(options.aws_access_key),
        aws_secret_key: keep(options.aws_secret_key),
        aws_region: keep(options.aws_region),
        aws_bucket: keep(options.aws_bucket),
        image_service_api_key: keep(options.image_service_api_key),
        image_service_url: keep(options.image_service_url),
    }
}

/// Clean a loose version string into semver.
///
/// Accepts forms like `v1`, `=1.2`, ` 1.2.3-beta.1 `. Anything that still
/// fails to parse becomes `0.0.0`.
pub fn normalize_version(raw: &str) -> Version {
    let trimmed = raw.trim();
    let stripped = trimmed
        .trim_start_matches('=')
        .trim_start_matches(['v', 'V'])
        .trim();

    let split_at = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(split_at);

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Version::new(0, 0, 0);
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    let candidate = format!("{}{}", parts.join("."), suffix);
    Version::parse(&candidate).unwrap_or_else(|_| Version::new(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = ToolConfig::from_options(ToolOptions::default());
        assert_eq!(config.source_directory, "src");
        assert_eq!(config.scheme, "noscheme");
        assert_eq!(config.version, Version::new(0, 0, 0));
        assert_eq!(config.host, None);
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.aws_bucket, None);
        assert_eq!(config.image_service_url, DEFAULT_IMAGE_SERVICE_URL);
    }

    #[test]
    fn test_explicit_options_win() {
        let config = ToolConfig::from_options(ToolOptions {
            source_directory: Some("img".into()),
            scheme: Some("fticon".into()),
            version: Some("v4.2.1".into()),
            ..Default::default()
        });
        assert_eq!(config.source_directory, "img");
        assert_eq!(config.scheme, "fticon");
        assert_eq!(config.version, Version::new(4, 2, 1));
        assert_eq!(config.versioned_path(), "fticon/v4");
        assert_eq!(config.versioned_scheme(), "fticon-v4");
    }

    #[test]
    fn test_blank_options_fall_back() {
        let config = ToolConfig::from_options(ToolOptions {
            scheme: Some("".into()),
            image_service_api_key: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(config.scheme, "noscheme");
        assert_eq!(config.image_service_api_key, None);
    }

    #[test]
    fn test_normalize_version_loose_forms() {
        assert_eq!(normalize_version("v1"), Version::new(1, 0, 0));
        assert_eq!(normalize_version("=2.3"), Version::new(2, 3, 0));
        assert_eq!(normalize_version(" 3.4.5 "), Version::new(3, 4, 5));
        assert_eq!(normalize_version("v7.0.0-beta.1").major, 7);
    }

    #[test]
    fn test_normalize_version_invalid_falls_back() {
        assert_eq!(normalize_version("not-a-version"), Version::new(0, 0, 0));
        assert_eq!(normalize_version(""), Version::new(0, 0, 0));
        assert_eq!(normalize_version("1.2.3.4"), Version::new(0, 0, 0));
        assert_eq!(normalize_version("1..2"), Version::new(0, 0, 0));
    }
}
