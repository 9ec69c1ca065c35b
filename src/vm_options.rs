use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// VM option that switches off coroutine debug probes; the sandbox attaches its own agent.
pub(crate) const COROUTINES_DEBUG_OFF: &str = "kotlinx.coroutines.debug=off";

/// Load a `.vmoptions` file as trimmed lines, minus the coroutine-debug switch.
///
/// A missing path or file yields no lines.
pub(crate) fn load_filtered(path: Option<&Path>) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };
    let content = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "vm options file not found");
            return Vec::new();
        }
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable vm options file: {err}");
            return Vec::new();
        }
    };
    filter_lines(&content)
}

fn filter_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !is_suppressed(line))
        .map(str::to_string)
        .collect()
}

fn is_suppressed(line: &str) -> bool {
    line.contains(COROUTINES_DEBUG_OFF)
}
