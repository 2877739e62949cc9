//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration file extension is not one of toml, yaml or json.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A value could not be parsed or failed validation.
    #[display("invalid configuration")]
    Invalid,
    /// The resource directory override is missing or is not a directory.
    #[display("invalid resource directory: {}", _0.display())]
    Resources(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Configuration errors need the user to fix something; none are retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::NotFound(PathBuf::from("/etc/rasterpdf.toml")).to_string(),
            "configuration file not found: /etc/rasterpdf.toml"
        );
        assert_eq!(ErrorKind::Invalid.to_string(), "invalid configuration");
        assert!(!ErrorKind::Invalid.is_retryable());
    }
}
