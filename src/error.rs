//! # Error Handling
//!
//! This module defines the error type shared by every step of the sink. It
//! uses `thiserror` to build a single `Error` enum whose variants map onto the
//! step that failed:
//!
//! - **`Configuration`**: the destination or base specification is missing,
//!   empty, or otherwise unusable. Raised synchronously by `Sink::new` for
//!   literal values, or per descriptor when a destination function yields an
//!   empty path. Always fatal to the stage.
//! - **`DirectoryCreation`**: creating a destination directory failed for a
//!   reason other than "already exists".
//! - **`Write`**: opening, writing, relaying, or closing a destination file.
//! - **`ModeChange`**: a permission change was needed and failed.
//! - **`Symlink`**: link creation failed.
//! - **`Stat`**: the destination could not be inspected.
//!
//! The I/O variants keep the underlying `std::io::Error` as their source so
//! callers can recover the OS error code (for example `EACCES`) through
//! [`Error::raw_os_error`] or [`Error::kind`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for sink operations
#[derive(Error, Debug)]
pub enum Error {
    /// The sink configuration is invalid.
    #[error("Invalid sink configuration: {message}")]
    Configuration { message: String },

    /// A destination directory could not be created.
    #[error("Failed to create directory '{}': {source}", path.display())]
    DirectoryCreation { path: PathBuf, source: io::Error },

    /// Opening, writing, relaying or closing a destination file failed.
    ///
    /// `operation` names the step: `open`, `write`, `relay` or `close`.
    #[error("Failed to {operation} '{}': {source}", path.display())]
    Write {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// Changing the permission bits of a destination failed.
    #[error("Failed to change mode of '{}' to {mode:o}: {source}", path.display())]
    ModeChange {
        path: PathBuf,
        mode: u32,
        source: io::Error,
    },

    /// Creating a symbolic link failed.
    #[error("Failed to create symlink '{}' -> '{}': {source}", path.display(), target.display())]
    Symlink {
        path: PathBuf,
        target: PathBuf,
        source: io::Error,
    },

    /// The destination could not be stat'ed.
    #[error("Failed to stat '{}': {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    /// The worker pool for concurrent processing could not be built.
    #[error("Worker pool error: {message}")]
    ThreadPool { message: String },

    /// Walking a source tree failed.
    #[error("Source walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn write(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn stat(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// The operation that failed, as a short static label.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configure",
            Self::DirectoryCreation { .. } => "mkdir",
            Self::Write { operation, .. } => operation,
            Self::ModeChange { .. } => "chmod",
            Self::Symlink { .. } => "symlink",
            Self::Stat { .. } => "stat",
            Self::ThreadPool { .. } => "spawn",
            Self::Walk(_) => "walk",
            Self::Glob(_) => "glob",
            Self::Yaml(_) => "parse",
            Self::Io(_) => "io",
        }
    }

    fn io_source(&self) -> Option<&io::Error> {
        match self {
            Self::DirectoryCreation { source, .. }
            | Self::Write { source, .. }
            | Self::ModeChange { source, .. }
            | Self::Symlink { source, .. }
            | Self::Stat { source, .. } => Some(source),
            Self::Io(source) => Some(source),
            Self::Walk(err) => err.io_error(),
            _ => None,
        }
    }

    /// The kind of the underlying I/O error, if any.
    pub fn kind(&self) -> Option<io::ErrorKind> {
        self.io_source().map(io::Error::kind)
    }

    /// The OS error code of the underlying I/O error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_source().and_then(io::Error::raw_os_error)
    }

    /// Whether this error stops the stage from accepting further input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::ThreadPool { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
