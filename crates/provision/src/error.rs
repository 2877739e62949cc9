//! Provisioning Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A provisioning error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource source does not contain the requested resource. This is
    /// a packaging mistake; retrying will not help.
    #[display("resource not found: {_0}")]
    ResourceNotFound(#[error(not(source))] String),
    /// An archive could not be decoded or unpacked.
    #[display("corrupt archive: {_0}")]
    CorruptArchive(#[error(not(source))] String),
    /// The provisioning root is missing or is not a directory.
    #[display("invalid provisioning root: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// Reading, writing or renaming on disk failed (permissions, disk full).
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
