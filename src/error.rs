//! Build error taxonomy.
//!
//! Every fatal condition maps to one stable diagnostic code so sandbox
//! deployment tooling can match on it without parsing messages.

use std::path::PathBuf;
use thiserror::Error;

pub const ERR_CONFIG: &str = "CF001";
pub const ERR_RESERVED_IDENTIFIER: &str = "CF002";
pub const ERR_UNSUPPORTED_SPECIFIER: &str = "CF003";
pub const ERR_UNRESOLVED_IMPORT: &str = "CF004";
pub const ERR_FILE_NOT_TRACKED: &str = "CF005";
pub const ERR_PARSE: &str = "CF006";
pub const ERR_IO: &str = "CF007";

#[derive(Debug, Error)]
pub enum BuildError {
    /// Missing or invalid configuration. Aborts before any file is processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// User code already uses the reserved namespace prefix.
    #[error(
        "{}: identifier \"{identifier}\" can't be used, \"{prefix}\" is a reserved prefix",
        .file.display()
    )]
    ReservedIdentifier {
        file: PathBuf,
        identifier: String,
        prefix: &'static str,
    },

    /// Import specifier shape the flat sandbox namespace cannot express.
    #[error(
        "{}: import specifier \"{specifier}\" is not supported: {reason}",
        .file.display()
    )]
    UnsupportedSpecifier {
        file: PathBuf,
        specifier: String,
        reason: String,
    },

    /// Import specifier does not name a tracked module file.
    #[error(
        "{}: import \"{specifier}\" does not resolve to a module file in this project",
        .file.display()
    )]
    UnresolvedImport { file: PathBuf, specifier: String },

    /// A build was requested for a path outside the project's file set.
    #[error(
        "file not found in project: {}\ntracked files:\n{}",
        .file.display(),
        .tracked.join("\n")
    )]
    FileNotTracked { file: PathBuf, tracked: Vec<String> },

    #[error("{}: parse error: {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::Config(_) => ERR_CONFIG,
            BuildError::ReservedIdentifier { .. } => ERR_RESERVED_IDENTIFIER,
            BuildError::UnsupportedSpecifier { .. } => ERR_UNSUPPORTED_SPECIFIER,
            BuildError::UnresolvedImport { .. } => ERR_UNRESOLVED_IMPORT,
            BuildError::FileNotTracked { .. } => ERR_FILE_NOT_TRACKED,
            BuildError::Parse { .. } => ERR_PARSE,
            BuildError::Io(_) => ERR_IO,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
