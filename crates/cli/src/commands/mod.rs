//! Subcommand handlers and the output helpers they share.

pub mod api;
pub mod schema;

use std::fs;
use std::path::Path;

use tracing::info;

/// Write `contents` to `path`, creating parent directories.
pub fn write_output(path: &Path, contents: &str, what: &str) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| {
            format!("Failed to create output directory {}: {err}", parent.display())
        })?;
    }
    fs::write(path, contents)
        .map_err(|err| format!("Failed to write {what} to {}: {err}", path.display()))?;
    info!(path = %path.display(), bytes = contents.len(), what, "Wrote output.");
    Ok(())
}

/// Command-line list when given, otherwise the config list.
pub fn prefer_flags(flags: Vec<String>, config: &[String]) -> Vec<String> {
    if flags.is_empty() {
        config.to_vec()
    } else {
        flags
    }
}
