use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Parsed `product-info.json` shipped with an installation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ProductInfo {
    pub(crate) name: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) build_number: Option<String>,
    pub(crate) product_code: Option<String>,
    pub(crate) launch: Vec<Launch>,
}

/// One platform-specific launch configuration recorded at build time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Launch {
    pub(crate) os: String,
    pub(crate) arch: Option<String>,
    pub(crate) vm_options_file_path: Option<String>,
    pub(crate) additional_jvm_arguments: Vec<String>,
}

/// The launch facts the composer consumes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ProductMetadata {
    pub(crate) vm_options_file_path: Option<String>,
    pub(crate) additional_jvm_arguments: Vec<String>,
}

impl From<&Launch> for ProductMetadata {
    fn from(launch: &Launch) -> Self {
        Self {
            vm_options_file_path: launch.vm_options_file_path.clone(),
            additional_jvm_arguments: launch.additional_jvm_arguments.clone(),
        }
    }
}

impl ProductInfo {
    pub(crate) fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub(crate) fn parse(content: &str) -> Result<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(content);
        let info = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            anyhow::anyhow!("invalid product info at `{}`: {}", err.path(), err.inner())
        })?;
        Ok(info)
    }

    /// Launch entry for the host platform.
    pub(crate) fn current_launch(&self) -> Option<&Launch> {
        self.launch_for(host_os(), host_arch())
    }

    /// Launch entry for `os`/`arch`.
    ///
    /// An entry with a matching or missing arch wins over the first entry that
    /// only matches the OS.
    pub(crate) fn launch_for(&self, os: &str, arch: &str) -> Option<&Launch> {
        let mut os_matches = self
            .launch
            .iter()
            .filter(|launch| launch.os.eq_ignore_ascii_case(os));
        let first = os_matches.clone().next();
        os_matches
            .find(|launch| {
                launch
                    .arch
                    .as_deref()
                    .is_none_or(|value| value.eq_ignore_ascii_case(arch))
            })
            .or(first)
    }
}

/// Platform name as recorded in `product-info.json`.
pub(crate) fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macOS",
        "windows" => "Windows",
        _ => "Linux",
    }
}

/// Architecture name as recorded in `product-info.json`.
pub(crate) fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "aarch64",
        _ => "amd64",
    }
}
