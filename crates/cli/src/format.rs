//! Optional external formatter run over generated files.

use std::path::Path;
use std::process::Command;

use clap::Args;
use tracing::{debug, info};

use crate::config::FormatConfig;

/// Formatter used when the config names none.
pub const DEFAULT_FORMAT_COMMAND: [&str; 3] = ["swift-format", "format", "--in-place"];

#[derive(Args, Debug, Clone, Default)]
pub struct FormatArgs {
    /// Run the formatter on the generated Swift file
    #[arg(long, overrides_with = "no_format")]
    pub format: bool,
    /// Skip the formatter even if the config enables it
    #[arg(long = "no-format", overrides_with = "format")]
    pub no_format: bool,
}

impl FormatArgs {
    /// Formatter argv to run, or `None` when formatting is off.
    pub fn resolve(&self, config: &FormatConfig) -> Option<Vec<String>> {
        let enabled = if self.format {
            true
        } else if self.no_format {
            false
        } else {
            config.enabled.unwrap_or(false)
        };
        enabled.then(|| {
            config.command.clone().unwrap_or_else(|| {
                DEFAULT_FORMAT_COMMAND
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect()
            })
        })
    }
}

/// Run `command` with `file` appended; a missing executable or a nonzero exit
/// is an error carrying the formatter's output.
pub fn run_formatter(command: &[String], file: &Path) -> Result<(), String> {
    let (program, rest) = command
        .split_first()
        .ok_or("Formatter command is empty")?;
    let resolved = which::which(program)
        .map_err(|err| format!("Formatter `{program}` not found: {err}"))?;

    debug!(
        formatter = %resolved.display(),
        path = %file.display(),
        "Running formatter."
    );
    let output = Command::new(&resolved)
        .args(rest)
        .arg(file)
        .output()
        .map_err(|err| format!("Failed to run formatter `{program}`: {err}"))?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "Formatter `{program}` failed on {} ({}):\n{}{}",
            file.display(),
            output.status,
            stdout.trim_end(),
            stderr.trim_end()
        ));
    }
    info!(formatter = %program, path = %file.display(), "Formatted output.");
    Ok(())
}
