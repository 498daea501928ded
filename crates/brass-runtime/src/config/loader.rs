//! Layered configuration loading.
//!
//! Settings are assembled with `figment`. Each layer overrides the ones before it:
//!
//! 1. [`BrassConfig::default`]
//! 2. `brass.{profile}.toml` (or `.yaml`), next to the base file
//! 3. `brass.toml` / `config.toml` (or the YAML names)
//! 4. `BRASS_*` environment variables, nested with `__`
//! 5. values passed to [`ConfigLoader::merge`]
//!
//! So `BRASS_LOGGING__LEVEL=debug` sets `logging.level`, and
//! `BRASS_DISPATCH__SUGGESTION_THRESHOLD=0.9` sets
//! `dispatch.suggestion_threshold`. `BRASS_PROFILE` picks the profile and is
//! not itself a setting.
//!
//! TOML support is behind the default `toml-config` feature and YAML behind
//! `yaml-config`.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().profile("production").load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BrassConfig;

const ENV_PREFIX: &str = "BRASS_";
const PROFILE_ENV: &str = "BRASS_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod`/`dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `BRASS_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configuration file syntax compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    #[allow(unused_mut)]
    fn enabled() -> Vec<Self> {
        let mut formats = Vec::new();
        #[cfg(feature = "toml-config")]
        formats.push(Self::Toml);
        #[cfg(feature = "yaml-config")]
        formats.push(Self::Yaml);
        formats
    }

    fn for_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            #[cfg(feature = "toml-config")]
            "toml" => Some(Self::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Base file names, in search order.
    fn file_names(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["brass.toml", "config.toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["brass.yaml", "brass.yml", "config.yaml", "config.yml"],
        }
    }

    fn layer(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// Builds a [`BrassConfig`] from defaults, files, environment and overrides.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    dirs: Vec<PathBuf>,
    read_env: bool,
    /// Explicit file; disables the directory search.
    file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            dirs: Vec::new(),
            read_env: true,
            file: None,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a directory to look for configuration files in.
    ///
    /// With no directories the loader searches the working directory and
    /// `<user config dir>/brass`.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("brass")),
            None => self,
        }
    }

    /// Reads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` over every other source.
    pub fn merge(mut self, config: BrassConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<BrassConfig> {
        let profile = self.profile.clone();
        let config: BrassConfig = self.into_figment()?.extract()?;

        debug!(
            %profile,
            prefix = %config.bot.prefix,
            level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn into_figment(self) -> ConfigResult<Figment> {
        let defaults = Figment::from(Serialized::defaults(BrassConfig::default()));

        let mut figment = match &self.file {
            Some(path) => Self::explicit_file(defaults, path)?,
            None => self.searched_files(defaults),
        };

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    fn explicit_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let format = FileFormat::for_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        info!(path = %path.display(), "Loading configuration file");
        Ok(format.layer(figment, path))
    }

    fn searched_files(&self, mut figment: Figment) -> Figment {
        let dirs = if self.dirs.is_empty() {
            Self::default_dirs()
        } else {
            self.dirs.clone()
        };

        let mut found = false;
        for format in FileFormat::enabled() {
            for path in self.files_for(format, &dirs) {
                info!(path = %path.display(), "Loading configuration file");
                figment = format.layer(figment, &path);
                found = true;
            }
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }

    fn default_dirs() -> Vec<PathBuf> {
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("brass")))
            .collect()
    }

    /// Existing files of one format, lowest priority first. The search ends
    /// at the first base file; a profile variant beside it goes before it.
    fn files_for(&self, format: FileFormat, dirs: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in dirs {
            for name in format.file_names() {
                let Some((stem, ext)) = name.rsplit_once('.') else {
                    continue;
                };
                let variant = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if variant.is_file() {
                    files.push(variant);
                }
                let base = dir.join(name);
                if base.is_file() {
                    files.push(base);
                    return files;
                }
            }
        }
        files
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<BrassConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BrassConfig> {
    ConfigLoader::new().file(path).load()
}
