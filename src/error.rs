use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::version::VersionError;

/// The only error that escapes argument composition.
#[derive(Debug, Error)]
pub(crate) enum ComposeError {
    #[error("invalid installation `{}`: {issue}", root.display())]
    InvalidInstallation {
        root: PathBuf,
        #[source]
        issue: InstallationIssue,
    },
}

/// Why an installation directory was not recognized.
#[derive(Debug, Error)]
pub(crate) enum InstallationIssue {
    #[error("no build number marker found")]
    MissingInstallationMarker,
    #[error("failed to read build number marker {}", path.display())]
    UnreadableMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unparsable build number")]
    InvalidBuildNumber(#[source] VersionError),
}
