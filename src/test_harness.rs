use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tempfile::TempDir;

use crate::product_info::host_os;

/// Throwaway installation directory laid out like an unpacked IDE build.
pub(crate) struct InstallationFixture {
    temp_dir: TempDir,
}

impl InstallationFixture {
    /// Empty directory without a build number marker.
    pub(crate) fn empty() -> Result<Self> {
        let temp_dir = tempfile::tempdir().context("create temp dir")?;
        Ok(Self { temp_dir })
    }

    /// Directory carrying `build.txt` with `build_number`.
    pub(crate) fn with_build(build_number: &str) -> Result<Self> {
        let fixture = Self::empty()?;
        fixture.write("build.txt", build_number)?;
        Ok(fixture)
    }

    pub(crate) fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub(crate) fn resolve(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    pub(crate) fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.resolve(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create fixture parent dir")?;
        }
        fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Write `product-info.json` with one launch entry for the host platform.
    pub(crate) fn product_info(
        &self,
        vm_options_file_path: Option<&str>,
        additional_jvm_arguments: &[&str],
    ) -> Result<PathBuf> {
        let mut launch = json!({
            "os": host_os(),
            "launcherPath": "bin/idea.sh",
            "javaExecutablePath": "jbr/bin/java",
            "additionalJvmArguments": additional_jvm_arguments,
        });
        if let Some(path) = vm_options_file_path {
            launch["vmOptionsFilePath"] = json!(path);
        }
        let info = json!({
            "name": "IntelliJ IDEA",
            "version": "2023.1",
            "productCode": "IC",
            "launch": [launch],
        });
        self.write("product-info.json", &info.to_string())
    }

    pub(crate) fn boot_jar(&self) -> Result<PathBuf> {
        self.write("lib/boot.jar", "PK")
    }
}
