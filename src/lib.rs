//! Image Set Tools - Manifest Builder and Publisher
//!
//! # Operations
//! 1. Build a manifest of a directory of images
//! 2. Publish every image to an object store
//! 3. Purge changed images from the image service
//! 4. Verify SVG images

pub mod config;
pub mod hashing;
pub mod manifest;
pub mod pipeline;
pub mod publish;
pub mod purge;
pub mod report;
pub mod validation;

pub use config::{ToolConfig, ToolOptions};
pub use hashing::{hash_file, sha512_hex};
pub use manifest::{ImageExtension, ImageRecord, ImageSetManifest, LegacyManifest};
pub use pipeline::{ImageSetTools, Result, ToolError};
pub use publish::{ObjectStore, S3ObjectStore};
pub use purge::PurgeClient;
pub use report::{MemoryReporter, NoopReporter, Reporter, TracingReporter};
pub use validation::{SvgRule, SvgVerifier, SvgViolation};

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MANIFEST_FILE: &str = "imageset.json";
pub const LEGACY_MANIFEST_FILE: &str = "imageList.json";
