use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Failure to read a numeric version out of a string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(crate) enum VersionError {
    #[error("invalid version format: `{text}` has no numeric segment")]
    InvalidFormat { text: String },
    #[error("invalid version format: component `{component}` of `{text}` is out of range")]
    ComponentOutOfRange { text: String, component: String },
}

/// Dotted numeric version such as `221.5080.210`.
///
/// Missing trailing components compare as zero, so `221` and `221.0` are equal.
#[derive(Clone, Debug)]
pub(crate) struct Version {
    components: Vec<u64>,
}

impl Version {
    pub(crate) fn new(components: impl Into<Vec<u64>>) -> Self {
        Self {
            components: components.into(),
        }
    }

    /// Parse a dot-delimited version.
    ///
    /// Leading digits of each component are kept; parsing stops at the first
    /// component without any, so `223.SNAPSHOT` reads as `223`.
    pub(crate) fn parse(text: &str) -> Result<Self, VersionError> {
        let trimmed = text.trim();
        let mut components = Vec::new();
        for part in trimmed.split('.') {
            let digits: &str = {
                let end = part
                    .char_indices()
                    .find(|(_, ch)| !ch.is_ascii_digit())
                    .map(|(index, _)| index)
                    .unwrap_or(part.len());
                &part[..end]
            };
            if digits.is_empty() {
                break;
            }
            let value = digits
                .parse::<u64>()
                .map_err(|_| VersionError::ComponentOutOfRange {
                    text: trimmed.to_string(),
                    component: digits.to_string(),
                })?;
            components.push(value);
        }
        if components.is_empty() {
            return Err(VersionError::InvalidFormat {
                text: trimmed.to_string(),
            });
        }
        Ok(Self { components })
    }

    /// Parse a build identifier like `IC-221.5080.210`, using the part after the last dash.
    pub(crate) fn from_build_number(text: &str) -> Result<Self, VersionError> {
        let segment = text.trim().rsplit('-').next().unwrap_or_default();
        Self::parse(segment)
    }

    #[cfg(test)]
    pub(crate) fn components(&self) -> &[u64] {
        &self.components
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|index| {
                let left = self.components.get(index).copied().unwrap_or(0);
                let right = other.components.get(index).copied().unwrap_or(0);
                left.cmp(&right)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .components
            .iter()
            .map(|component| component.to_string())
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&text)
    }
}
