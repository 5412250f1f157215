use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cli::Cli;
use crate::error::HandlerError;
use crate::event::Event;

pub const DEFAULT_STATE_MESSAGE: &str = "{{entity.name}}:{{check.name}}:{{check.output}}";
pub const DEFAULT_ENTITY_ID: &str = "{{entity.name}}/{{check.name}}";

/// Annotation prefix for per-entity and per-check overrides
pub const ANNOTATION_KEYSPACE: &str = "sensu.io/plugins/sensu-squadcast-handler/config";

const CONFIG_DIR_NAME: &str = "sensu-squadcast-handler";

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Handler configuration
///
/// File keys accept the Sensu option spelling (`api-url`) as well.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Squadcast webhook URL (secret)
    #[serde(alias = "api-url")]
    pub api_url: String,
    /// Template for the incident state message
    #[serde(alias = "state-message")]
    pub state_message: String,
    /// Template for the incident entity id
    #[serde(alias = "entity-id")]
    pub entity_id: String,
    #[serde(alias = "log-level")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            state_message: DEFAULT_STATE_MESSAGE.to_string(),
            entity_id: DEFAULT_ENTITY_ID.to_string(),
            log_level: LogLevel::default(),
        }
    }
}

// The webhook URL carries the Squadcast token.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &if self.api_url.is_empty() { "" } else { "<redacted>" })
            .field("state_message", &self.state_message)
            .field("entity_id", &self.entity_id)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            let path = Self::expand_path(path);
            return Self::load_from_file(&path).context(format!("Failed to load config from {}", path.display()));
        }

        // SQUADCAST_HANDLER_CONFIG is as explicit as --config
        if let Ok(env_path) = std::env::var("SQUADCAST_HANDLER_CONFIG") {
            let path = Self::expand_path(Path::new(&env_path));
            return Self::load_from_file(&path).context(format!(
                "Failed to load config from {} (SQUADCAST_HANDLER_CONFIG)",
                path.display()
            ));
        }

        // A config file that exists but does not load is fatal. Logging is not
        // up yet, and falling back to defaults would hide the cause.

        // Try ~/.config/sensu-squadcast-handler/config.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join(CONFIG_DIR_NAME).join("config.yaml");
            if path.exists() {
                return Self::load_from_file(&path).context(format!("Failed to load config from {}", path.display()));
            }
        }

        // Try ./squadcast-handler.yaml
        let local_config = PathBuf::from("squadcast-handler.yaml");
        if local_config.exists() {
            return Self::load_from_file(&local_config).context("Failed to load local config squadcast-handler.yaml");
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::debug!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Layer command-line flags and their environment variables over the file config
    pub fn apply_args(mut self, cli: &Cli) -> Self {
        if let Some(ref api_url) = cli.api_url {
            self.api_url = api_url.clone();
        }
        if let Some(ref state_message) = cli.state_message {
            self.state_message = state_message.clone();
        }
        if let Some(ref entity_id) = cli.entity_id {
            self.entity_id = entity_id.clone();
        }
        if cli.verbose {
            self.log_level = LogLevel::Debug;
        }
        self
    }

    /// Layer event annotations over this config
    ///
    /// Check annotations beat entity annotations. The API URL is secret and
    /// never read from annotations.
    pub fn with_event_overrides(&self, event: &Event) -> Self {
        let mut config = self.clone();

        if let Some(value) = event.annotation(&annotation_key("state-message")) {
            log::debug!("state-message overridden by annotation");
            config.state_message = value.to_string();
        }
        if let Some(value) = event.annotation(&annotation_key("entity-id")) {
            log::debug!("entity-id overridden by annotation");
            config.entity_id = value.to_string();
        }

        config
    }

    /// Check the webhook URL before any network activity
    pub fn validate(&self) -> std::result::Result<(), HandlerError> {
        if self.api_url.is_empty() {
            return Err(HandlerError::MissingApiUrl);
        }

        let url = Url::parse(&self.api_url).map_err(|e| HandlerError::InvalidApiUrl(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(HandlerError::InvalidApiUrl(format!(
                    "scheme must be http or https, got {}",
                    scheme
                )));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(HandlerError::InvalidApiUrl("URL must have a host".to_string()));
        }

        Ok(())
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

fn annotation_key(option: &str) -> String {
    format!("{}/{}", ANNOTATION_KEYSPACE, option)
}
