use crate::dates::Zone;
use crate::errors::{AppError, AppResult, ErrorContextExt};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// On-disk configuration file
///
/// Every field is optional; environment variables override whatever the file
/// provides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub defaults: DefaultsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: Option<String>,
    pub timeout_secs: Option<u64>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub current_project_id: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Regional API deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    TickTick,
    Dida365,
}

impl Host {
    /// Parse a host selector, falling back to ticktick.com for unknown values
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|h| h.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("ticktick.com") => Host::TickTick,
            Some("dida365.com") => Host::Dida365,
            Some(other) => {
                warn!(
                    "Invalid host '{}'. Using default (ticktick.com). Valid: ticktick.com, dida365.com",
                    other
                );
                Host::TickTick
            }
        }
    }

    pub fn domain(&self) -> &'static str {
        match self {
            Host::TickTick => "ticktick.com",
            Host::Dida365 => "dida365.com",
        }
    }

    /// Base URL of the OAuth-protected open API
    pub fn open_api_base(&self) -> String {
        format!("https://api.{}/open/v1/", self.domain())
    }

    /// Base URL of the session-authenticated web API
    pub fn web_api_base(&self) -> String {
        format!("https://api.{}/api/v2/", self.domain())
    }

    pub fn oauth_base(&self) -> String {
        format!("https://{}/oauth/", self.domain())
    }
}

/// Credentials handed to the API client untouched
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Effective settings for one invocation
///
/// Built once at startup and passed explicitly to the resolver, the date
/// normalizer and the API client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: Host,
    pub timeout: Duration,
    pub credentials: Credentials,
    pub current_project_id: Option<String>,
    /// Raw IANA name from `TZ` or the config file, checked by [`Settings::zone`]
    pub timezone: Option<String>,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Merge a config file with an environment lookup (environment wins)
    pub fn from_sources<F>(config: Config, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str, fallback: Option<String>| {
            env(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
        };

        let timeout_secs = match lookup("TICKTICK_TIMEOUT", None) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::validation(format!(
                    "Invalid TICKTICK_TIMEOUT value '{raw}'. Expected a number of seconds."
                ))
            })?,
            None => config.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let zone_name = lookup("TZ", config.defaults.timezone.clone());

        Ok(Self {
            host: Host::parse(lookup("TICKTICK_HOST", config.api.host.clone()).as_deref()),
            timeout: Duration::from_secs(timeout_secs),
            credentials: Credentials {
                access_token: lookup("TICKTICK_ACCESS_TOKEN", config.api.access_token),
                client_id: lookup("TICKTICK_CLIENT_ID", config.api.client_id),
                client_secret: lookup("TICKTICK_CLIENT_SECRET", config.api.client_secret),
                redirect_uri: lookup("TICKTICK_REDIRECT_URI", config.api.redirect_uri)
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
                username: lookup("TICKTICK_USERNAME", config.api.username),
                password: lookup("TICKTICK_PASSWORD", config.api.password),
            },
            current_project_id: lookup(
                "TICKTICK_CURRENT_PROJECT_ID",
                config.defaults.current_project_id,
            ),
            timezone: zone_name,
            logging: config.logging,
        })
    }

    /// Active timezone; an unknown name only fails the commands that need it
    pub fn zone(&self) -> AppResult<Zone> {
        Zone::from_name(self.timezone.as_deref())
    }

    /// Configured credential values, used to scrub user-visible messages
    pub fn secret_values(&self) -> Vec<String> {
        let c = &self.credentials;
        [&c.access_token, &c.client_secret, &c.password]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

/// Locates and loads the configuration file
///
/// The file is only read, never created or written: a missing default file
/// simply means "no file settings".
pub struct ConfigManager {
    config_path: Option<PathBuf>,
    config: Config,
}

impl ConfigManager {
    /// Load from an explicit path (which must exist) or the default location
    pub fn new(explicit_path: Option<PathBuf>) -> AppResult<Self> {
        match explicit_path {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok(Self {
                    config_path: Some(path),
                    config,
                })
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => {
                    let config = Self::load(&path)?;
                    Ok(Self {
                        config_path: Some(path),
                        config,
                    })
                }
                _ => Ok(Self {
                    config_path: None,
                    config: Config::default(),
                }),
            },
        }
    }

    /// `<config dir>/ticktick-cli/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ticktick-cli").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn load(path: &Path) -> AppResult<Config> {
        let content = fs::read_to_string(path).in_file_operation(path, "read config file")?;
        toml::from_str(&content)
            .map_err(|e| AppError::config_with_source(format!("Failed to parse {}", path.display()), e))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Effective settings using the process environment
    pub fn settings(&self) -> AppResult<Settings> {
        Settings::from_sources(self.config.clone(), |name| std::env::var(name).ok())
    }
}
