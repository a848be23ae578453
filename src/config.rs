use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_SERVER_PORT: u16 = 3222;
const DEFAULT_DATABASE_URL: &str = "http://localhost:5984";
const DEFAULT_DATABASE_NAME: &str = "students";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
    /// The configuration cache was already populated.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the student records server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub server_port: u16,
    /// Which store implementation backs the service.
    pub store_backend: StoreBackend,
    /// Base URL of the CouchDB instance.
    pub database_url: String,
    /// CouchDB database holding student documents.
    pub database_name: String,
    /// Optional CouchDB user for basic auth.
    pub database_user: Option<String>,
    /// Optional CouchDB password for basic auth.
    pub database_password: Option<String>,
    /// Directory uploaded images are written to.
    pub upload_dir: PathBuf,
    /// Request body limit applied to create and update.
    pub max_upload_bytes: usize,
}

/// Supported record stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// CouchDB reached over HTTP.
    CouchDb,
    /// Process-local store; nothing survives a restart.
    Memory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            store_backend: StoreBackend::CouchDb,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            database_user: None,
            database_password: None,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to local defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            server_port: parse_optional("SERVER_PORT")?.unwrap_or(defaults.server_port),
            store_backend: load_env_optional("STORE_BACKEND")
                .map(|value| {
                    value.parse().map_err(|()| ConfigError::InvalidValue {
                        name: "STORE_BACKEND",
                        value,
                    })
                })
                .transpose()?
                .unwrap_or(defaults.store_backend),
            database_url: load_env_optional("DATABASE_URL").unwrap_or(defaults.database_url),
            database_name: load_env_optional("DATABASE_NAME").unwrap_or(defaults.database_name),
            database_user: load_env_optional("DATABASE_USER"),
            database_password: load_env_optional("DATABASE_PASSWORD"),
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: key, value })
        })
        .transpose()
}

impl std::str::FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "couchdb" | "couch" => Ok(Self::CouchDb),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment (and `.env`, when present) and cache it.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    CONFIG.get().ok_or(ConfigError::AlreadyInitialized)
}
