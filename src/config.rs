use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::beacon::DEFAULT_ENDPOINT;
use crate::cookies::{is_cookie_token, DEFAULT_LIFETIME_DAYS};
use crate::error::ConfigError;
use crate::identity::cookie_name_for;

const MAX_COOKIE_LIFETIME_DAYS: i64 = 3650;

/// Top-level configuration file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// `[beacon]` section. Left optional so a missing section surfaces as [`ConfigError::Missing`]
    /// instead of a generic parse failure.
    pub beacon: Option<BeaconConfig>,
    /// `[server]` section for the demo HTTP server.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Raw `[beacon]` section as written in the file.
#[derive(Debug, Deserialize, Clone)]
pub struct BeaconConfig {
    /// Master switch; when `false` no cookies are read or written.
    pub enabled: bool,
    /// Site identifier used in the beacon path and the cookie name.
    pub site_shortname: String,
    /// HMAC secret for cookie tokens.
    pub salt: String,
    /// Analytics endpoint base URL (http or https).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Visitor cookie lifetime, 1 to 3650 days.
    #[serde(default = "default_cookie_lifetime_days")]
    pub cookie_lifetime_days: i64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_cookie_lifetime_days() -> i64 {
    DEFAULT_LIFETIME_DAYS
}

/// `[server]` section.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Listen address, `127.0.0.1:7341` by default.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Validated, immutable beacon settings shared by every request.
#[derive(Debug, Clone)]
pub struct BeaconSettings {
    pub enabled: bool,
    /// Checked to form a valid cookie name when enabled.
    pub site_shortname: String,
    pub salt: String,
    /// Endpoint with any trailing slash still attached; the builder strips it.
    pub endpoint: String,
    /// Lifetime of newly issued visitor cookies.
    pub cookie_lifetime: Duration,
}

/// Process-wide handle to the settings.
pub type SharedSettings = Arc<BeaconSettings>;

impl BeaconSettings {
    /// Validates the `[beacon]` section.
    ///
    /// A missing section is an error: the subsystem never falls back to a
    /// silently disabled state. `enabled = false` skips the remaining checks.
    pub fn from_config(config: Option<&BeaconConfig>) -> Result<Self, ConfigError> {
        let beacon = config.ok_or_else(|| ConfigError::Missing("[beacon] section".to_string()))?;

        if beacon.enabled {
            if beacon.site_shortname.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "beacon.site_shortname must not be empty".to_string(),
                ));
            }
            // The shortname becomes part of the visitor cookie name; anything
            // a browser would split or drop makes the id unreadable next visit.
            if !is_cookie_token(&cookie_name_for(&beacon.site_shortname)) {
                return Err(ConfigError::Invalid(format!(
                    "beacon.site_shortname '{}' must contain only cookie-name characters \
                     (visible ASCII except ()<>@,;:\\\"/[]?={{}})",
                    beacon.site_shortname
                )));
            }
            if beacon.salt.is_empty() {
                return Err(ConfigError::Invalid(
                    "beacon.salt must not be empty".to_string(),
                ));
            }
            if !(1..=MAX_COOKIE_LIFETIME_DAYS).contains(&beacon.cookie_lifetime_days) {
                return Err(ConfigError::Invalid(format!(
                    "beacon.cookie_lifetime_days must be in [1, {}]",
                    MAX_COOKIE_LIFETIME_DAYS
                )));
            }
            match url::Url::parse(&beacon.endpoint) {
                Ok(u) if u.scheme() == "https" || u.scheme() == "http" => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "beacon.endpoint must be an absolute http(s) URL, got '{}'",
                        beacon.endpoint
                    )))
                }
            }
        }

        Ok(Self {
            enabled: beacon.enabled,
            site_shortname: beacon.site_shortname.clone(),
            salt: beacon.salt.clone(),
            endpoint: beacon.endpoint.clone(),
            cookie_lifetime: Duration::days(
                beacon
                    .cookie_lifetime_days
                    .clamp(1, MAX_COOKIE_LIFETIME_DAYS),
            ),
        })
    }
}

impl Config {
    /// Builds the shared settings for request handlers.
    pub fn settings(&self) -> Result<SharedSettings, ConfigError> {
        BeaconSettings::from_config(self.beacon.as_ref()).map(Arc::new)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Fail at load time rather than on the first request.
    config.settings()?;

    Ok(config)
}
