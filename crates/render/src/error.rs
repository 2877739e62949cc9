//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The provisioning root does not exist or cannot be determined.
    #[display("invalid provisioning root: {}", _0.display())]
    Configuration(#[error(not(source))] PathBuf),
    /// The host operating system has no bundled renderer.
    #[display("unsupported platform: {_0}")]
    UnsupportedPlatform(#[error(not(source))] String),
    /// The renderer or its script could not be put on disk. The provisioning
    /// error is kept as a child in the error tree.
    #[display("failed to provision renderer resources")]
    Provisioning,
    /// Strict mode only: the requested output folder does not exist.
    #[display("output folder is not a directory: {}", _0.display())]
    InvalidOutputFolder(#[error(not(source))] PathBuf),
    /// A generation parameter could not be parsed.
    #[display("invalid {field}: {value}")]
    InvalidParameter {
        /// The parameter that failed to parse.
        field: &'static str,
        /// The rejected input.
        value: String,
    },
    /// The renderer executable could not be started.
    #[display("failed to start renderer: {}", _0.display())]
    Spawn(#[error(not(source))] PathBuf),
    /// The renderer exited with a non-zero exit code.
    #[display("renderer exited with code: {_0}")]
    RendererFailed(#[error(not(source))] i32),
    /// The renderer was terminated by a signal.
    #[display("renderer was killed before finishing")]
    RendererKilled,
    /// The renderer did not finish before the deadline and was killed.
    #[display("renderer timed out")]
    RendererTimeout,
    /// The renderer reported success but produced no file.
    #[display("renderer produced no output at: {}", _0.display())]
    OutputMissing(#[error(not(source))] PathBuf),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RendererTimeout | Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::UnsupportedPlatform("plan9".to_string()), "unsupported platform: plan9")]
    #[case(ErrorKind::RendererFailed(3), "renderer exited with code: 3")]
    #[case(ErrorKind::OutputMissing(PathBuf::from("/out/a.pdf")), "renderer produced no output at: /out/a.pdf")]
    #[case(
        ErrorKind::InvalidParameter { field: "page format", value: "A9".to_string() },
        "invalid page format: A9"
    )]
    fn error_kind_display(#[case] kind: ErrorKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::RendererTimeout.is_retryable());
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::RendererFailed(1).is_retryable());
        assert!(!ErrorKind::UnsupportedPlatform("plan9".to_string()).is_retryable());
        assert!(!ErrorKind::Provisioning.is_retryable());
    }
}
