use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub line: LineConfig,
    pub embeddings: EmbeddingsConfig,
    pub intent: IntentConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    /// SQLite `busy_timeout` pragma, in milliseconds. Turn writes serialize
    /// on the single writer, so this bounds how long a write waits.
    pub busy_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LineConfig {
    pub channel_secret: SecretString,
    pub channel_token: SecretString,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingsConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct IntentConfig {
    /// Cosine-distance cutoff above which resolution returns `unknown`.
    /// Expected to be recalibrated as the phrase catalog grows; matching
    /// code never hardcodes it.
    pub distance_threshold: f32,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
    pub fetch_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub line_channel_secret: Option<String>,
    pub line_channel_token: Option<String>,
    pub embeddings_api_key: Option<String>,
    pub embeddings_base_url: Option<String>,
    pub embeddings_model: Option<String>,
    pub intent_distance_threshold: Option<f32>,
    pub catalog_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bookline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
                busy_timeout_ms: 5000,
            },
            line: LineConfig {
                channel_secret: String::new().into(),
                channel_token: String::new().into(),
                api_base: "https://api.line.me".to_string(),
                timeout_secs: 10,
            },
            embeddings: EmbeddingsConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "text-embedding-3-small".to_string(),
                timeout_secs: 10,
            },
            intent: IntentConfig { distance_threshold: 0.45 },
            catalog: CatalogConfig {
                base_url: "https://www.naiin.com".to_string(),
                fetch_timeout_secs: 10,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 5000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bookline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
            if let Some(busy_timeout_ms) = database.busy_timeout_ms {
                self.database.busy_timeout_ms = busy_timeout_ms;
            }
        }

        if let Some(line) = patch.line {
            if let Some(channel_secret_value) = line.channel_secret {
                self.line.channel_secret = secret_value(channel_secret_value);
            }
            if let Some(channel_token_value) = line.channel_token {
                self.line.channel_token = secret_value(channel_token_value);
            }
            if let Some(api_base) = line.api_base {
                self.line.api_base = api_base;
            }
            if let Some(timeout_secs) = line.timeout_secs {
                self.line.timeout_secs = timeout_secs;
            }
        }

        if let Some(embeddings) = patch.embeddings {
            if let Some(api_key_value) = embeddings.api_key {
                self.embeddings.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = embeddings.base_url {
                self.embeddings.base_url = base_url;
            }
            if let Some(model) = embeddings.model {
                self.embeddings.model = model;
            }
            if let Some(timeout_secs) = embeddings.timeout_secs {
                self.embeddings.timeout_secs = timeout_secs;
            }
        }

        if let Some(intent) = patch.intent {
            if let Some(distance_threshold) = intent.distance_threshold {
                self.intent.distance_threshold = distance_threshold;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(base_url) = catalog.base_url {
                self.catalog.base_url = base_url;
            }
            if let Some(fetch_timeout_secs) = catalog.fetch_timeout_secs {
                self.catalog.fetch_timeout_secs = fetch_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BOOKLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BOOKLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("BOOKLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BOOKLINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BOOKLINE_DATABASE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOKLINE_DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms =
                parse_u64("BOOKLINE_DATABASE_BUSY_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_LINE_CHANNEL_SECRET") {
            self.line.channel_secret = secret_value(value);
        }
        if let Some(value) = read_env("BOOKLINE_LINE_CHANNEL_TOKEN") {
            self.line.channel_token = secret_value(value);
        }
        if let Some(value) = read_env("BOOKLINE_LINE_API_BASE") {
            self.line.api_base = value;
        }

        if let Some(value) = read_env("BOOKLINE_EMBEDDINGS_API_KEY") {
            self.embeddings.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("BOOKLINE_EMBEDDINGS_BASE_URL") {
            self.embeddings.base_url = value;
        }
        if let Some(value) = read_env("BOOKLINE_EMBEDDINGS_MODEL") {
            self.embeddings.model = value;
        }
        if let Some(value) = read_env("BOOKLINE_EMBEDDINGS_TIMEOUT_SECS") {
            self.embeddings.timeout_secs = parse_u64("BOOKLINE_EMBEDDINGS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_INTENT_DISTANCE_THRESHOLD") {
            self.intent.distance_threshold =
                parse_f32("BOOKLINE_INTENT_DISTANCE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_CATALOG_BASE_URL") {
            self.catalog.base_url = value;
        }
        if let Some(value) = read_env("BOOKLINE_CATALOG_FETCH_TIMEOUT_SECS") {
            self.catalog.fetch_timeout_secs =
                parse_u64("BOOKLINE_CATALOG_FETCH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BOOKLINE_SERVER_PORT") {
            self.server.port = parse_u16("BOOKLINE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("BOOKLINE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(channel_secret_value) = overrides.line_channel_secret {
            self.line.channel_secret = secret_value(channel_secret_value);
        }
        if let Some(channel_token_value) = overrides.line_channel_token {
            self.line.channel_token = secret_value(channel_token_value);
        }
        if let Some(api_key_value) = overrides.embeddings_api_key {
            self.embeddings.api_key = Some(secret_value(api_key_value));
        }
        if let Some(base_url) = overrides.embeddings_base_url {
            self.embeddings.base_url = base_url;
        }
        if let Some(model) = overrides.embeddings_model {
            self.embeddings.model = model;
        }
        if let Some(distance_threshold) = overrides.intent_distance_threshold {
            self.intent.distance_threshold = distance_threshold;
        }
        if let Some(base_url) = overrides.catalog_base_url {
            self.catalog.base_url = base_url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.line.channel_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "line.channel_secret is required (set BOOKLINE_LINE_CHANNEL_SECRET)".to_string(),
            ));
        }
        if self.line.channel_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "line.channel_token is required (set BOOKLINE_LINE_CHANNEL_TOKEN)".to_string(),
            ));
        }
        if self.embeddings.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "embeddings.base_url must not be empty".to_string(),
            ));
        }
        if !(self.intent.distance_threshold > 0.0 && self.intent.distance_threshold < 2.0) {
            return Err(ConfigError::Validation(format!(
                "intent.distance_threshold must be within (0, 2), got {}",
                self.intent.distance_threshold
            )));
        }
        if self.catalog.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("catalog.base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

fn resolve_config_path(requested: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = requested {
        return path.exists().then(|| path.to_path_buf());
    }
    let default_path = PathBuf::from("bookline.toml");
    default_path.exists().then_some(default_path)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    line: Option<LinePatch>,
    embeddings: Option<EmbeddingsPatch>,
    intent: Option<IntentPatch>,
    catalog: Option<CatalogPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LinePatch {
    channel_secret: Option<String>,
    channel_token: Option<String>,
    api_base: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingsPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct IntentPatch {
    distance_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    base_url: Option<String>,
    fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
