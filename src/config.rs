use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Default chunk window, in characters, applied when `CHUNK_SIZE` is unset.
pub const DEFAULT_CHUNK_SIZE: usize = 300;
/// Default overlap, in characters, applied when `CHUNK_OVERLAP` is unset.
pub const DEFAULT_CHUNK_OVERLAP: usize = 30;
/// Default per-request timeout for calls to external collaborators.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_UNSTRUCTURED_API_URL: &str = "https://api.unstructured.io";

/// Runtime configuration for the papernotes server.
///
/// Loaded once at process start and threaded explicitly into component
/// constructors; components copy the fields they need and never read the
/// environment themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the relational store holding paper records.
    pub database_url: String,
    /// API key presented to the relational store.
    pub database_api_key: String,
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for chunk storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Base URL of the document partitioning service.
    pub unstructured_api_url: String,
    /// Credential for the partitioning service. Checked right before the
    /// partition call rather than at startup, so the server can boot without
    /// it and fail only the runs that need it.
    pub unstructured_api_key: Option<String>,
    /// Base URL of the Ollama runtime used for extraction and embeddings.
    pub ollama_url: String,
    /// Model identifier used for structured note extraction.
    pub notes_model: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Chunk window size in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Timeout applied to every outbound HTTP request.
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: load_env("DATABASE_URL")?,
            database_api_key: load_env("DATABASE_API_KEY")?,
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            unstructured_api_url: load_env_optional("UNSTRUCTURED_API_URL")
                .unwrap_or_else(|| DEFAULT_UNSTRUCTURED_API_URL.to_string()),
            unstructured_api_key: load_env_optional("UNSTRUCTURED_API_KEY"),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            notes_model: load_env("NOTES_MODEL")?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            chunk_size: parse_optional("CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: parse_optional("CHUNK_OVERLAP")?.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            server_port: parse_optional("SERVER_PORT")?,
            request_timeout_secs: parse_optional("REQUEST_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        database_url = %config.database_url,
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        notes_model = %config.notes_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
