use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use env_logger::{Builder, Target, WriteStyle};

/// Logging subsystems of trackscout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggingSubsystem {
    /// Main application logging
    #[serde(rename = "main")]
    Main,
    /// HTTP endpoints
    #[serde(rename = "api")]
    Api,
    /// Last.fm metadata lookups
    #[serde(rename = "metadata")]
    Metadata,
    /// ACRCloud identification
    #[serde(rename = "fingerprint")]
    Fingerprint,
    /// Recommendation cascade
    #[serde(rename = "recommendations")]
    Recommendations,
    /// HTTP client operations
    #[serde(rename = "http")]
    Http,
    /// Configuration loading and parsing
    #[serde(rename = "config")]
    Config,
    /// Third-party dependencies
    #[serde(rename = "deps")]
    Dependencies,
}

impl LoggingSubsystem {
    /// Module prefixes covered by this subsystem, comma separated
    pub fn module_prefix(&self) -> &'static str {
        match self {
            LoggingSubsystem::Main => "trackscout",
            LoggingSubsystem::Api => "trackscout::api",
            LoggingSubsystem::Metadata => "trackscout::helpers::lastfm",
            LoggingSubsystem::Fingerprint => "trackscout::helpers::acrcloud",
            LoggingSubsystem::Recommendations => "trackscout::recommendations",
            LoggingSubsystem::Http => "trackscout::helpers::http_client,reqwest,hyper,ureq",
            LoggingSubsystem::Config => "trackscout::config",
            LoggingSubsystem::Dependencies => "rocket,serde",
        }
    }

    pub fn all() -> Vec<LoggingSubsystem> {
        vec![
            LoggingSubsystem::Main,
            LoggingSubsystem::Api,
            LoggingSubsystem::Metadata,
            LoggingSubsystem::Fingerprint,
            LoggingSubsystem::Recommendations,
            LoggingSubsystem::Http,
            LoggingSubsystem::Config,
            LoggingSubsystem::Dependencies,
        ]
    }

    fn parse(name: &str) -> Option<LoggingSubsystem> {
        match name.to_lowercase().as_str() {
            "main" => Some(LoggingSubsystem::Main),
            "api" => Some(LoggingSubsystem::Api),
            "metadata" | "lastfm" => Some(LoggingSubsystem::Metadata),
            "fingerprint" | "acrcloud" => Some(LoggingSubsystem::Fingerprint),
            "recommendations" => Some(LoggingSubsystem::Recommendations),
            "http" => Some(LoggingSubsystem::Http),
            "config" => Some(LoggingSubsystem::Config),
            "deps" | "dependencies" => Some(LoggingSubsystem::Dependencies),
            _ => None,
        }
    }
}

/// Logging configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Target for log output (stdout, stderr)
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_true")]
    pub timestamps: bool,

    #[serde(default = "default_true")]
    pub colors: bool,

    /// Subsystem-specific log levels; unknown names are used as module paths
    #[serde(default, deserialize_with = "deserialize_subsystems")]
    pub subsystems: HashMap<String, String>,

    #[serde(default)]
    pub include_module_path: bool,

    #[serde(default)]
    pub include_line_numbers: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target() -> String {
    "stdout".to_string()
}

fn default_true() -> bool {
    true
}

/// Drops keys starting with an underscore, which are used as comments
fn deserialize_subsystems<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw_map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(raw_map
        .into_iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .collect())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            target: default_target(),
            timestamps: true,
            colors: true,
            subsystems: HashMap::new(),
            include_module_path: false,
            include_line_numbers: false,
        }
    }
}

const VERBOSITY_ORDER: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl LoggingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read logging config file: {}", e))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse logging config: {}", e))
    }

    fn parse_log_level(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => {
                eprintln!("Warning: Unknown log level '{}', defaulting to 'info'", level);
                LevelFilter::Info
            }
        }
    }

    /// Module filters from the subsystem settings, shortest path first
    fn module_filters(&self) -> Vec<(String, String)> {
        let mut all_filters = Vec::new();
        for (name, level) in &self.subsystems {
            match LoggingSubsystem::parse(name) {
                Some(subsystem) => {
                    for prefix in subsystem.module_prefix().split(',') {
                        all_filters.push((prefix.trim().to_string(), level.clone()));
                    }
                }
                None => all_filters.push((name.clone(), level.clone())),
            }
        }

        let mut sorted: Vec<_> = Self::resolve_filter_conflicts(all_filters).into_iter().collect();
        sorted.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        sorted
    }

    /// Filter string in env_logger syntax
    pub fn build_filter_string(&self) -> String {
        let mut parts = vec![self.level.clone()];
        for (path, level) in self.module_filters() {
            parts.push(format!("{}={}", path, level));
        }
        parts.join(",")
    }

    /// If a module path is configured more than once, the most verbose level wins
    fn resolve_filter_conflicts(filters: Vec<(String, String)>) -> HashMap<String, String> {
        let mut path_levels: HashMap<String, Vec<String>> = HashMap::new();
        for (path, level) in filters {
            path_levels.entry(path).or_default().push(level);
        }

        path_levels
            .into_iter()
            .map(|(path, mut levels)| {
                if levels.len() == 1 {
                    return (path, levels.remove(0));
                }
                let level = Self::most_verbose_level(&levels);
                warn!("Conflicting log levels for module '{}': {:?}. Using most verbose: '{}'",
                      path, levels, level);
                (path, level)
            })
            .collect()
    }

    fn most_verbose_level(levels: &[String]) -> String {
        levels
            .iter()
            .map(|level| level.to_lowercase())
            .filter_map(|level| VERBOSITY_ORDER.iter().position(|l| *l == level))
            .max()
            .map(|index| VERBOSITY_ORDER[index].to_string())
            .unwrap_or_else(|| "off".to_string())
    }

    /// Install the global logger
    pub fn initialize_logger(&self) -> Result<(), String> {
        let filter_string = self.build_filter_string();

        let mut builder = Builder::new();
        builder.parse_env("RUST_LOG");
        builder.filter(None, Self::parse_log_level(&self.level));
        for (path, level) in self.module_filters() {
            builder.filter(Some(&path), Self::parse_log_level(&level));
        }

        builder.write_style(if self.colors { WriteStyle::Auto } else { WriteStyle::Never });

        match self.target.to_lowercase().as_str() {
            "stdout" => {
                builder.target(Target::Stdout);
            }
            "stderr" => {
                builder.target(Target::Stderr);
            }
            _ => return Err(format!("Unknown logging target: {}", self.target)),
        }

        let include_module_path = self.include_module_path;
        let include_line_numbers = self.include_line_numbers;
        let timestamps = self.timestamps;

        builder.format(move |buf, record| {
            let mut output = String::new();

            if timestamps {
                output.push_str(&format!("[{}] ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
            }
            output.push_str(&format!("[{}] ", record.level()));
            if include_module_path {
                if let Some(module) = record.module_path() {
                    output.push_str(&format!("[{}] ", module));
                }
            }
            if include_line_numbers {
                if let (Some(file), Some(line)) = (record.file(), record.line()) {
                    output.push_str(&format!("[{}:{}] ", file, line));
                }
            }
            output.push_str(&record.args().to_string());

            writeln!(buf, "{}", output)
        });

        builder.try_init()
            .map_err(|e| format!("Failed to initialize logger: {}", e))?;

        debug!("Logging initialized with filter: {}", filter_string);
        Ok(())
    }
}

/// Initialize logging from command line flags and an optional config file
pub fn initialize_logging(debug_mode: bool, verbose_mode: bool, config_file: Option<&Path>) -> Result<(), String> {
    let mut config = match config_file {
        Some(path) if path.exists() => LoggingConfig::from_file(path)?,
        Some(path) => return Err(format!("Logging config file {:?} not found", path)),
        None => LoggingConfig::default(),
    };

    if debug_mode || verbose_mode {
        config.level = "debug".to_string();
    }

    config.initialize_logger()?;
    if debug_mode {
        info!("Debug mode enabled via command line");
    }
    Ok(())
}
