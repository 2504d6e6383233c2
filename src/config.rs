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

/// Runtime configuration for the document query service.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Gemini embedding and generation endpoints.
    pub gemini_api_key: String,
    /// Base URL of the Gemini REST API.
    pub gemini_base_url: String,
    /// API key for Pinecone control and data plane requests.
    pub pinecone_api_key: String,
    /// Name of the Pinecone index that stores document vectors.
    pub pinecone_index_name: String,
    /// Optional data-plane host. When set, index discovery is skipped.
    pub pinecone_host: Option<String>,
    /// Cloud provider used when the index has to be created.
    pub pinecone_cloud: String,
    /// Cloud region used when the index has to be created.
    pub pinecone_region: String,
    /// Embedding model identifier passed to Gemini.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Generation model used for query analysis.
    pub llm_model: String,
    /// Output token cap for generated analyses.
    pub max_output_tokens: u32,
    /// Character budget for a single document chunk.
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk.
    pub chunk_overlap: usize,
    /// Filesystem path of the SQLite document catalog.
    pub catalog_path: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Number of chunks retrieved when a query does not ask for a count.
    pub query_default_limit: usize,
    /// Upper bound applied to requested retrieval counts.
    pub query_max_limit: usize,
}

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            gemini_api_key: load_env("GEMINI_API_KEY")?,
            gemini_base_url: load_env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            pinecone_api_key: load_env("PINECONE_API_KEY")?,
            pinecone_index_name: load_env_or("PINECONE_INDEX_NAME", "document-embeddings"),
            pinecone_host: load_env_optional("PINECONE_HOST"),
            pinecone_cloud: load_env_or("PINECONE_CLOUD", "aws"),
            pinecone_region: load_env_or("PINECONE_REGION", "us-east-1"),
            embedding_model: load_env_or("EMBEDDING_MODEL", "models/text-embedding-004"),
            embedding_dimension: load_env_parsed("EMBEDDING_DIMENSION", 768)?,
            llm_model: load_env_or("LLM_MODEL", "models/gemini-2.5-flash"),
            max_output_tokens: load_env_parsed("MAX_OUTPUT_TOKENS", 8192)?,
            chunk_size: load_env_parsed("CHUNK_SIZE", 1000)?,
            chunk_overlap: load_env_parsed("CHUNK_OVERLAP", 200)?,
            catalog_path: load_env_or("CATALOG_PATH", "data/catalog.db"),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            query_default_limit: load_env_parsed("QUERY_DEFAULT_LIMIT", 5)?,
            query_max_limit: load_env_parsed("QUERY_MAX_LIMIT", 20)?,
        };
        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".into()));
        }
        Ok(config)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
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
        index = %config.pinecone_index_name,
        embedding_model = %config.embedding_model,
        llm_model = %config.llm_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
