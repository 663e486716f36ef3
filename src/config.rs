// Configuration for trackscout
//
// Settings are read from a JSON file. Every service section may live either in the
// "services" subtree or at the top level of the file; environment variables override
// credentials and the listen address.

use crate::helpers::acrcloud;
use crate::helpers::lastfm::{DEFAULT_LOOKUP_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_SECS};
use crate::recommendations::cascade::{DEFAULT_LIMIT, DEFAULT_OVERFETCH_MARGIN, DEFAULT_TAG_COUNT};
use crate::recommendations::{CascadeSettings, SourcePolicy};
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "trackscout.json";

/// Prefix of the credential values shipped as defaults
pub const PLACEHOLDER_PREFIX: &str = "YOUR_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Helper function to get service configuration with backward compatibility
///
/// This function first tries to find the service in the "services" structure,
/// then falls back to the old top-level structure.
///
/// # Arguments
/// * `config` - The configuration JSON object
/// * `service_name` - The name of the service to look up (e.g., "lastfm", "acrcloud")
///
/// # Returns
/// * `Option<&serde_json::Value>` - The service configuration if found, None otherwise
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use trackscout::config::get_service_config;
///
/// let config = json!({
///   "services": {
///     "lastfm": { "api_key": "abc" }
///   }
/// });
/// assert_eq!(get_service_config(&config, "lastfm").unwrap()["api_key"], "abc");
///
/// let old_config = json!({
///   "lastfm": { "api_key": "def" }
/// });
/// assert_eq!(get_service_config(&old_config, "lastfm").unwrap()["api_key"], "def");
/// ```
pub fn get_service_config<'a>(config: &'a serde_json::Value, service_name: &str) -> Option<&'a serde_json::Value> {
    if let Some(services) = config.get("services") {
        if let Some(service_config) = services.get(service_name) {
            debug!("Found {} configuration in services section", service_name);
            return Some(service_config);
        }
    }

    if let Some(service_config) = config.get(service_name) {
        debug!("Found {} configuration at top level (legacy structure)", service_name);
        return Some(service_config);
    }

    debug!("No {} configuration found, using defaults", service_name);
    None
}

/// True if a credential has not been filled in
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with(PLACEHOLDER_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebserverConfig {
    pub host: String,
    pub port: u16,
    /// Directory that holds index.html
    pub static_dir: String,
    /// Largest accepted upload in MiB
    pub max_upload_mb: u64,
}

impl Default for WebserverConfig {
    fn default() -> Self {
        WebserverConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            static_dir: ".".to_string(),
            max_upload_mb: 10,
        }
    }
}

impl WebserverConfig {
    pub fn upload_limit_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastfmConfig {
    pub api_key: String,
    /// Timeout of list queries
    pub timeout_secs: u64,
    /// Timeout of single-item lookups
    pub lookup_timeout_secs: u64,
}

impl Default for LastfmConfig {
    fn default() -> Self {
        LastfmConfig {
            api_key: "YOUR_LASTFM_API_KEY".to_string(),
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            lookup_timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcrCloudConfig {
    /// API host, e.g. "identify-eu-west-1.acrcloud.com"
    pub host: String,
    pub access_key: String,
    pub access_secret: String,
    pub timeout_secs: u64,
}

impl Default for AcrCloudConfig {
    fn default() -> Self {
        AcrCloudConfig {
            host: "YOUR_ACRCLOUD_HOST".to_string(),
            access_key: "YOUR_ACRCLOUD_ACCESS_KEY".to_string(),
            access_secret: "YOUR_ACRCLOUD_ACCESS_SECRET".to_string(),
            timeout_secs: acrcloud::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Tracks returned by /identify
    pub identify_limit: usize,
    /// Tracks returned by /recommend
    pub more_limit: usize,
    pub tag_count: usize,
    pub overfetch_margin: usize,
    pub source_policy: SourcePolicy,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        RecommendationConfig {
            identify_limit: DEFAULT_LIMIT,
            more_limit: DEFAULT_LIMIT,
            tag_count: DEFAULT_TAG_COUNT,
            overfetch_margin: DEFAULT_OVERFETCH_MARGIN,
            source_policy: SourcePolicy::default(),
        }
    }
}

impl RecommendationConfig {
    pub fn cascade_settings(&self) -> CascadeSettings {
        CascadeSettings {
            tag_count: self.tag_count,
            overfetch_margin: self.overfetch_margin,
            source_policy: self.source_policy,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppConfig {
    pub webserver: WebserverConfig,
    pub lastfm: LastfmConfig,
    pub acrcloud: AcrCloudConfig,
    pub recommendations: RecommendationConfig,
}

fn section<T: DeserializeOwned + Default>(config: &serde_json::Value, name: &str) -> Result<T, ConfigError> {
    match get_service_config(config, name) {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::ParseError(format!("section '{}': {}", name, e))),
        None => Ok(T::default()),
    }
}

impl AppConfig {
    /// Parse a configuration document; missing sections and fields get defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        if !value.is_object() {
            return Err(ConfigError::ParseError("top level must be a JSON object".to_string()));
        }

        Ok(AppConfig {
            webserver: section(&value, "webserver")?,
            lastfm: section(&value, "lastfm")?,
            acrcloud: section(&value, "acrcloud")?,
            recommendations: section(&value, "recommendations")?,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e.to_string()))?;
        let config = Self::from_json(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the given file, or the default file if present, or fall back to defaults.
    ///
    /// An explicitly given file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(AppConfig::default())
                }
            }
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_environment(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("LASTFM_API_KEY") {
            debug!("Last.fm API key taken from environment");
            self.lastfm.api_key = value;
        }
        if let Some(value) = get("ACRCLOUD_HOST") {
            self.acrcloud.host = value;
        }
        if let Some(value) = get("ACRCLOUD_ACCESS_KEY") {
            self.acrcloud.access_key = value;
        }
        if let Some(value) = get("ACRCLOUD_ACCESS_SECRET") {
            debug!("ACRCloud secret taken from environment");
            self.acrcloud.access_secret = value;
        }
        if let Some(value) = get("TRACKSCOUT_HOST") {
            self.webserver.host = value;
        }
        if let Some(value) = get("TRACKSCOUT_PORT") {
            self.webserver.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TRACKSCOUT_PORT".to_string(), value.clone()))?;
        }
        Ok(())
    }

    /// Names of the credentials that still hold placeholder values
    pub fn placeholder_credentials(&self) -> Vec<&'static str> {
        let credentials = [
            ("lastfm.api_key", &self.lastfm.api_key),
            ("acrcloud.host", &self.acrcloud.host),
            ("acrcloud.access_key", &self.acrcloud.access_key),
            ("acrcloud.access_secret", &self.acrcloud.access_secret),
        ];
        credentials
            .into_iter()
            .filter(|(_, value)| is_placeholder(value))
            .map(|(name, _)| name)
            .collect()
    }

    /// Log a warning for every credential that is not configured
    pub fn warn_about_placeholders(&self) {
        for name in self.placeholder_credentials() {
            warn!("{} is not configured, requests using it will fail", name);
        }
    }
}
