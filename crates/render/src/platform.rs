use crate::error::{Error, ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Operating system families with a bundled renderer build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// Classify an operating system name, as reported by
    /// [`std::env::consts::OS`].
    pub fn from_os(os: impl AsRef<str>) -> Result<Self> {
        let os = os.as_ref();
        Ok(match os.trim().to_lowercase().as_str() {
            "windows" | "win" | "win32" | "win64" => Self::Windows,
            "linux" => Self::Linux,
            "macos" | "osx" | "darwin" => Self::MacOs,
            _ => exn::bail!(ErrorKind::UnsupportedPlatform(os.to_string())),
        })
    }

    /// The platform this program is running on.
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// File name of the renderer executable built for this platform.
    pub fn executable(&self) -> &'static str {
        match self {
            Self::Windows => "windows_phantomjs.exe",
            Self::Linux => "linux64_phantomjs.exe",
            Self::MacOs => "osx_phantomjs.exe",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        }
    }
}

impl FromStr for Platform {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_os(s)
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("windows", Platform::Windows, "windows_phantomjs.exe")]
    #[case("Win64", Platform::Windows, "windows_phantomjs.exe")]
    #[case("linux", Platform::Linux, "linux64_phantomjs.exe")]
    #[case("macos", Platform::MacOs, "osx_phantomjs.exe")]
    #[case("darwin", Platform::MacOs, "osx_phantomjs.exe")]
    fn test_from_os(#[case] os: &str, #[case] platform: Platform, #[case] executable: &str) {
        let resolved = Platform::from_os(os).unwrap();
        assert_eq!(resolved, platform);
        assert_eq!(resolved.executable(), executable);
    }

    #[rstest]
    #[case("freebsd")]
    #[case("plan9")]
    #[case("")]
    fn test_unsupported(#[case] os: &str) {
        let err = Platform::from_os(os).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedPlatform(os.to_string()));
    }

    #[test]
    #[cfg(any(target_os = "windows", target_os = "linux", target_os = "macos"))]
    fn test_current() {
        assert!(Platform::current().is_ok());
    }
}
