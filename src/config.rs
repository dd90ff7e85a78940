//! Upstream connection settings.
//!
//! Values come from an optional TOML file and are overridden by the
//! `UMAMI_URL`, `UMAMI_USERNAME` and `UMAMI_PASSWORD` environment variables.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "UMAMI_MCP_CONFIG";
/// File looked up next to the executable when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const URL_ENV: &str = "UMAMI_URL";
const USERNAME_ENV: &str = "UMAMI_USERNAME";
const PASSWORD_ENV: &str = "UMAMI_PASSWORD";

/// Errors raised while resolving the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required configuration: UMAMI_URL, UMAMI_USERNAME, UMAMI_PASSWORD")]
    Missing,
}

/// Credentials for one Umami instance
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// On-disk layout of the config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    umami_url: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl Config {
    /// Loads the file at `path` (a missing file is fine) and applies the
    /// process environment on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::resolve(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Merges file contents with variables from `env`; non-empty variables win.
    pub fn resolve(
        file_contents: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = match file_contents {
            Some(contents) => toml::from_str(contents)?,
            None => FileConfig::default(),
        };

        let pick = |key: &str, fallback: Option<String>| {
            env(key)
                .filter(|value| !value.is_empty())
                .or(fallback)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing)
        };

        Ok(Self {
            url: pick(URL_ENV, file.umami_url)?,
            username: pick(USERNAME_ENV, file.username)?,
            password: pick(PASSWORD_ENV, file.password)?,
        })
    }

    /// Where to look for the config file when none was given explicitly.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
