//! Manifest Types - Image Records and Their Serialized Forms

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extensions an image file may carry to be part of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    Gif,
    Jpg,
    Png,
    Svg,
}

impl ImageExtension {
    pub const ALL: [ImageExtension; 4] = [Self::Gif, Self::Jpg, Self::Png, Self::Svg];

    /// Exact, case-sensitive match against the allow-list
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageRecord {
    pub name: String,
    pub extension: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

impl ImageRecord {
    /// Whether the content changed since the manifest this record was diffed against
    pub fn is_updated(&self) -> bool {
        matches!(&self.previous_hash, Some(prev) if *prev != self.hash)
    }

    /// The object key this image is served under, without extension
    pub fn base_key(&self, versioned_path: &str) -> String {
        format!("{}/{}-{}", versioned_path, self.name, self.hash)
    }

    pub fn is_svg(&self) -> bool {
        self.extension.eq_ignore_ascii_case(ImageExtension::Svg.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSetManifest {
    pub source_directory: String,
    pub scheme: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub images: Vec<ImageRecord>,
}

impl ImageSetManifest {
    /// First record matching on `(name, extension, path)`
    pub fn find_image(&self, name: &str, extension: &str, path: &str) -> Option<&ImageRecord> {
        self.images
            .iter()
            .find(|i| i.name == name && i.extension == extension && i.path == path)
    }

    pub fn updated_images(&self) -> Vec<ImageRecord> {
        self.images.iter().filter(|i| i.is_updated()).cloned().collect()
    }

    pub fn to_legacy(&self) -> LegacyManifest {
        LegacyManifest {
            images: self
                .images
                .iter()
                .map(|i| LegacyImage { name: i.name.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyManifest {
    pub images: Vec<LegacyImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyImage {
    pub name: String,
}

/// A directory entry that qualifies as an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub name: String,
    pub extension: ImageExtension,
}

impl ImageFile {
    /// Classify a file name. Hidden files and unknown extensions give `None`.
    pub fn classify(file_name: &str) -> Option<Self> {
        if file_name.starts_with('.') {
            return None;
        }
        let path = Path::new(file_name);
        let extension = ImageExtension::from_extension(path.extension()?.to_str()?)?;
        let name = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            file_name: file_name.to_string(),
            name,
            extension,
        })
    }

    pub fn relative_path(&self, source_directory: &str) -> String {
        format!("{}/{}", source_directory.trim_end_matches('/'), self.file_name)
    }
}

/// List the image files of a directory, sorted by file name.
///
/// Only regular files (after following symlinks) are kept.
pub async fn list_image_files(dir: &Path) -> std::io::Result<Vec<(ImageFile, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = vec![];

    while let Some(entry) = entries.next_entry().await? {
        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(image) = ImageFile::classify(&file_name) else {
            continue;
        };
        let full_path = entry.path();
        match tokio::fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => files.push((image, full_path)),
            Ok(_) => {}
            // Dangling symlink
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    files.sort_by(|a, b| a.0.file_name.cmp(&b.0.file_name));
    Ok(files)
}

/// Pretty print with tab indentation
pub fn to_tab_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, hash: &str, previous: Option<&str>) -> ImageRecord {
        ImageRecord {
            name: name.into(),
            extension: "png".into(),
            path: format!("src/{name}.png"),
            previous_hash: previous.map(str::to_string),
            hash: hash.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_allowed_extensions() {
        for ext in ["gif", "jpg", "png", "svg"] {
            let file = ImageFile::classify(&format!("image.{ext}")).unwrap();
            assert_eq!(file.name, "image");
            assert_eq!(file.extension.as_str(), ext);
        }
    }

    #[test]
    fn test_classify_rejects_others() {
        assert!(ImageFile::classify("image.PNG").is_none());
        assert!(ImageFile::classify("image.jpeg").is_none());
        assert!(ImageFile::classify("README").is_none());
        assert!(ImageFile::classify(".png").is_none());
        assert!(ImageFile::classify(".hidden.png").is_none());
    }

    #[test]
    fn test_classify_keeps_inner_dots() {
        let file = ImageFile::classify("logo.dark.svg").unwrap();
        assert_eq!(file.name, "logo.dark");
        assert_eq!(file.relative_path("src/"), "src/logo.dark.svg");
    }

    #[test]
    fn test_is_updated() {
        assert!(!record("a", "1", None).is_updated());
        assert!(!record("a", "1", Some("1")).is_updated());
        assert!(record("a", "2", Some("1")).is_updated());
    }

    #[test]
    fn test_record_serialization_omits_unset_fields() {
        let json = serde_json::to_value(record("a", "1", None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "a", "extension": "png", "path": "src/a.png", "hash": "1"})
        );
    }

    #[test]
    fn test_empty_deprecated_is_kept() {
        let mut r = record("a", "1", Some("1"));
        r.deprecated = Some(String::new());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["deprecated"], "");
        assert_eq!(json["previousHash"], "1");
    }

    #[test]
    fn test_legacy_manifest_parses_as_full() {
        let legacy = r#"{"images": [{"name": "a"}, {"name": "b"}]}"#;
        let manifest: ImageSetManifest = serde_json::from_str(legacy).unwrap();
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(manifest.images[1].name, "b");
        assert!(manifest.updated_images().is_empty());
    }

    #[test]
    fn test_find_image_first_match() {
        let mut first = record("a", "1", None);
        first.url = Some("first".into());
        let mut second = record("a", "2", None);
        second.url = Some("second".into());
        let manifest = ImageSetManifest {
            images: vec![first, second],
            ..Default::default()
        };
        let found = manifest.find_image("a", "png", "src/a.png").unwrap();
        assert_eq!(found.url.as_deref(), Some("first"));
        assert!(manifest.find_image("a", "svg", "src/a.png").is_none());
    }

    #[test]
    fn test_to_legacy() {
        let manifest = ImageSetManifest {
            images: vec![record("a", "1", None), record("b", "2", None)],
            ..Default::default()
        };
        let legacy = serde_json::to_value(manifest.to_legacy()).unwrap();
        assert_eq!(legacy, serde_json::json!({"images": [{"name": "a"}, {"name": "b"}]}));
    }

    #[test]
    fn test_tab_json() {
        let out = to_tab_json(&LegacyManifest {
            images: vec![LegacyImage { name: "a".into() }],
        })
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\n\t\"images\": [\n\t\t{\n\t\t\t\"name\": \"a\"\n\t\t}\n\t]\n}");
    }

    #[tokio::test]
    async fn test_list_image_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.svg", "c.txt", ".hidden.gif", "d.JPG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = list_image_files(dir.path()).await.unwrap();
        let names: Vec<_> = files.iter().map(|(f, _)| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.svg", "b.png"]);
    }
}
