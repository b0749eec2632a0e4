//! Error type shared by every stage.

use std::path::PathBuf;

/// Errors produced while loading, discovering or rendering.
///
/// Classification gaps are not errors: they reduce to `unknown` and surface in
/// the generated output and usage report instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The entry file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The entry file is not in the accepted declaration subset.
    #[error("{}:{line}:{column}: {message}", path.display())]
    Syntax {
        /// File containing the error.
        path: PathBuf,
        /// 1-based line.
        line: usize,
        /// 1-based column.
        column: usize,
        /// Description of what was expected.
        message: String,
    },

    /// A required top-level export is absent.
    #[error("Required export `{name}` not found in {}", path.display())]
    MissingExport {
        /// Exact export name that was looked up.
        name: String,
        /// File that was searched.
        path: PathBuf,
    },

    /// A root export resolved to something with no function references in it.
    #[error(
        "Root `{root}` in {} contains no function references; it resolves to `{text}`",
        path.display()
    )]
    UnresolvedRoot {
        /// Root export name.
        root: String,
        /// Rendered type of the export.
        text: String,
        /// Declaration file that was searched.
        path: PathBuf,
    },

    /// The schema source has no `defineSchema(...)` call.
    #[error("No defineSchema(...) call found in {}", path.display())]
    MissingSchema {
        /// Schema source path.
        path: PathBuf,
    },

    /// The `defineSchema(...)` call does not have the expected shape.
    #[error("Invalid schema in {}: {message}", path.display())]
    InvalidSchema {
        /// Schema source path.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// Selection rules left no functions to generate.
    #[error("No functions selected from {}; check the include/exclude lists", path.display())]
    EmptySelection {
        /// Declaration file the functions were discovered in.
        path: PathBuf,
    },

    /// IR or report serialization failed.
    #[error("Failed to serialize {what}: {source}")]
    Json {
        /// Which document was being serialized.
        what: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
