use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::error::{ComposeError, InstallationIssue};
use crate::product_info::{ProductInfo, ProductMetadata};
use crate::version::Version;

const BUILD_NUMBER_MARKER: &str = "build.txt";
const PRODUCT_INFO_FILE: &str = "product-info.json";
const BUNDLE_RESOURCES_DIR: &str = "Resources";
const BOOT_CLASSPATH_JAR: &str = "lib/boot.jar";

/// Read-only view of one installed IDE build.
///
/// Derived facts are computed on first access and kept for the lifetime of the
/// value. Use a fresh `Installation` per directory.
#[derive(Debug)]
pub(crate) struct Installation {
    root: PathBuf,
    build_number: OnceLock<Version>,
    metadata: OnceLock<Option<ProductMetadata>>,
    boot_classpath_jar: OnceLock<Option<PathBuf>>,
}

impl Installation {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            build_number: OnceLock::new(),
            metadata: OnceLock::new(),
            boot_classpath_jar: OnceLock::new(),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Build number read from `build.txt`.
    ///
    /// Failures are not cached; retrying against unchanged files fails the same way.
    pub(crate) fn build_number(&self) -> Result<&Version, ComposeError> {
        if let Some(version) = self.build_number.get() {
            return Ok(version);
        }
        let version = self.read_build_number().map_err(|issue| {
            ComposeError::InvalidInstallation {
                root: self.root.clone(),
                issue,
            }
        })?;
        debug!(root = %self.root.display(), build = %version, "read build number");
        Ok(self.build_number.get_or_init(|| version))
    }

    /// Launch metadata for the host platform, if the installation records any.
    pub(crate) fn product_metadata(&self) -> Option<&ProductMetadata> {
        self.metadata
            .get_or_init(|| {
                let path = self.product_info_path()?;
                let info = ProductInfo::read(&path)
                    .inspect_err(|err| {
                        warn!(path = %path.display(), "ignoring product info: {err:#}");
                    })
                    .ok()?;
                debug!(
                    path = %path.display(),
                    product = info.name.as_deref().unwrap_or("unknown"),
                    code = info.product_code.as_deref().unwrap_or("unknown"),
                    version = info.version.as_deref().unwrap_or("unknown"),
                    build = info.build_number.as_deref().unwrap_or("unknown"),
                    "read product info"
                );
                let metadata = info.current_launch().map(ProductMetadata::from);
                if metadata.is_none() {
                    debug!(path = %path.display(), "no launch entry for host platform");
                }
                metadata
            })
            .as_ref()
    }

    /// `lib/boot.jar`, when shipped.
    pub(crate) fn boot_classpath_jar(&self) -> Option<&Path> {
        self.boot_classpath_jar
            .get_or_init(|| {
                let path = self.root.join(BOOT_CLASSPATH_JAR);
                path.is_file().then_some(path)
            })
            .as_deref()
    }

    /// VM options file named by the metadata, resolved against the root.
    ///
    /// The recorded path is relative to a directory one level below the root,
    /// so a leading `../` is dropped.
    pub(crate) fn vm_options_file(&self) -> Option<PathBuf> {
        self.product_metadata()
            .and_then(|metadata| metadata.vm_options_file_path.as_deref())
            .map(|recorded| self.root.join(normalize_recorded_path(recorded)))
    }

    fn read_build_number(&self) -> Result<Version, InstallationIssue> {
        let path = self
            .bundle_candidates(BUILD_NUMBER_MARKER)
            .into_iter()
            .find(|path| path.is_file())
            .ok_or(InstallationIssue::MissingInstallationMarker)?;
        let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => InstallationIssue::MissingInstallationMarker,
            _ => InstallationIssue::UnreadableMarker {
                path: path.clone(),
                source,
            },
        })?;
        Version::from_build_number(&content).map_err(InstallationIssue::InvalidBuildNumber)
    }

    fn product_info_path(&self) -> Option<PathBuf> {
        self.bundle_candidates(PRODUCT_INFO_FILE)
            .into_iter()
            .find(|path| path.is_file())
    }

    // macOS bundles keep these files under `Contents/Resources`.
    fn bundle_candidates(&self, file_name: &str) -> [PathBuf; 2] {
        [
            self.root.join(file_name),
            self.root.join(BUNDLE_RESOURCES_DIR).join(file_name),
        ]
    }
}

fn normalize_recorded_path(recorded: &str) -> &str {
    recorded
        .strip_prefix("../")
        .or_else(|| recorded.strip_prefix("..\\"))
        .unwrap_or(recorded)
}
