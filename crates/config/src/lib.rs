//! Layered configuration for the PDF generator.
//!
//! Values are merged from, in increasing priority: built-in defaults, a
//! `config.{toml,yaml,json}` file in the user's configuration directory, an
//! explicitly named file, and `RASTERPDF_*` environment variables (nested
//! keys separated by `__`, for example `RASTERPDF_DEFAULTS__FORMAT=letter`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use rasterpdf_provision::DirectorySource;
use rasterpdf_render::{GenerationParameters, GeneratorConfig, Platform};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_PREFIX: &str = "RASTERPDF_";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provisioning root; defaults to the directory of the running executable.
    pub root: Option<PathBuf>,
    /// Operating system to provision the renderer for, instead of the host's.
    pub platform: Option<String>,
    /// Renderer deadline in seconds. Zero disables the deadline.
    pub timeout_secs: u64,
    /// Provision resources from this directory instead of the built-in copies.
    pub resources: Option<PathBuf>,
    pub strict_output: bool,
    /// Page layout used when a request does not specify one.
    pub defaults: GenerationParameters,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            platform: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            resources: None,
            strict_output: false,
            defaults: GenerationParameters::default(),
        }
    }
}

impl Config {
    /// Load configuration from every layer, with `explicit` (if any) taking
    /// priority over the user configuration directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(dirs) = ProjectDirs::from("", "", "rasterpdf") {
            let dir = dirs.config_dir();
            tracing::trace!(dir = %dir.display(), "Looking for user configuration");
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            figment = merge_file(figment, path)?;
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Deserialize and validate a fully merged figment.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(platform) = &self.platform {
            Platform::from_os(platform).or_raise(|| ErrorKind::Invalid)?;
        }
        self.defaults.validate().or_raise(|| ErrorKind::Invalid)?;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Build the generator configuration these settings describe.
    pub fn into_generator_config(self) -> Result<GeneratorConfig> {
        let mut generator = GeneratorConfig::default()
            .with_timeout(self.timeout())
            .with_strict_output(self.strict_output)
            .with_defaults(self.defaults);
        if let Some(root) = self.root {
            generator = generator.with_root(root);
        }
        if let Some(platform) = self.platform {
            generator = generator.with_platform(platform);
        }
        if let Some(resources) = self.resources {
            let source = DirectorySource::new(&resources).or_raise(|| ErrorKind::Resources(resources.clone()))?;
            generator = generator.with_source(Arc::new(source));
        }
        Ok(generator)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rasterpdf_render::{DimensionUnit, Orientation, PageFormat};
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::extract(Figment::new()).map_err(|e| format!("{e:?}"))?;
            assert_eq!(config, Config::default());
            assert_eq!(config.timeout(), Some(Duration::from_secs(120)));
            Ok(())
        });
    }

    #[rstest]
    #[case("rasterpdf.toml", "timeout_secs = 30\n[defaults]\nformat = \"Letter\"\nzoom_factor = 1.5\n")]
    #[case("rasterpdf.yaml", "timeout_secs: 30\ndefaults:\n  format: letter\n  zoom: 1.5\n")]
    #[case("rasterpdf.json", r#"{"timeout_secs": 30, "defaults": {"format": "Letter", "zoom": 1.5}}"#)]
    fn test_explicit_file(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load(Some(Path::new(name))).map_err(|e| format!("{e:?}"))?;
            assert_eq!(config.timeout_secs, 30);
            assert_eq!(config.defaults.format, PageFormat::Letter);
            assert_eq!(config.defaults.zoom_factor, 1.5);
            assert_eq!(config.defaults.orientation, Orientation::Portrait);
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("rasterpdf.toml", "platform = \"linux\"\ntimeout_secs = 30\n")?;
            jail.set_env("RASTERPDF_TIMEOUT_SECS", "0");
            jail.set_env("RASTERPDF_STRICT_OUTPUT", "true");
            jail.set_env("RASTERPDF_DEFAULTS__ORIENTATION", "landscape");
            jail.set_env("RASTERPDF_DEFAULTS__UNIT", "cm");
            jail.set_env("RASTERPDF_DEFAULTS__WIDTH", "21");
            jail.set_env("RASTERPDF_DEFAULTS__HEIGHT", "29");
            let config = Config::load(Some(Path::new("rasterpdf.toml"))).map_err(|e| format!("{e:?}"))?;
            assert_eq!(config.platform.as_deref(), Some("linux"));
            assert_eq!(config.timeout(), None);
            assert!(config.strict_output);
            assert_eq!(config.defaults.orientation, Orientation::Landscape);
            assert_eq!(config.defaults.layout(), "21cm*29cm");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("missing.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::NotFound(PathBuf::from("missing.toml")));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_format() {
        Jail::expect_with(|jail| {
            jail.create_file("rasterpdf.ini", "timeout_secs=1")?;
            let err = Config::load(Some(Path::new("rasterpdf.ini"))).unwrap_err();
            assert_eq!(*err, ErrorKind::UnsupportedFormat(PathBuf::from("rasterpdf.ini")));
            Ok(())
        });
    }

    #[rstest]
    #[case("platform = \"plan9\"")]
    #[case("[defaults]\nzoom_factor = 0.0")]
    #[case("[defaults]\nzoom_factor = -2.5")]
    #[case("[defaults]\nformat = \"B5\"")]
    #[case("timeout_secs = \"soon\"")]
    fn test_invalid(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("rasterpdf.toml", contents)?;
            let err = Config::load(Some(Path::new("rasterpdf.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid);
            Ok(())
        });
    }

    #[test]
    fn test_into_generator_config() {
        Jail::expect_with(|jail| {
            let resources = jail.directory().join("resources");
            std::fs::create_dir(&resources).map_err(|e| e.to_string())?;
            let config = Config {
                root: Some(jail.directory().to_path_buf()),
                platform: Some("macos".to_string()),
                timeout_secs: 5,
                resources: Some(resources),
                strict_output: true,
                defaults: GenerationParameters::default().with_size(8, 11, DimensionUnit::Inch),
            };
            let generator = config.into_generator_config().map_err(|e| format!("{e:?}"))?;
            assert_eq!(generator.root.as_deref(), Some(jail.directory()));
            assert_eq!(generator.platform.as_deref(), Some("macos"));
            assert_eq!(generator.timeout, Some(Duration::from_secs(5)));
            assert!(generator.source.is_some());
            assert!(generator.strict_output);
            assert_eq!(generator.defaults.layout(), "8in*11in");
            Ok(())
        });
    }

    #[test]
    fn test_missing_resources() {
        let config = Config { resources: Some(PathBuf::from("/does/not/exist")), ..Config::default() };
        let err = config.into_generator_config().err().unwrap();
        assert_eq!(*err, ErrorKind::Resources(PathBuf::from("/does/not/exist")));
    }
}
