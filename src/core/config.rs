//! Process-wide configuration, loaded once from the environment at startup.
//!
//! The loaded `AppConfig` is wrapped in an `Arc` and injected into every
//! component constructor; it is never mutated after construction.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key (`GEMINI_API_KEY`).
    pub gemini_api_key: String,
    /// Gemini REST base URL, up to and including the API version segment.
    pub gemini_base_url: String,
    /// Generative model used for filter extraction and answer generation.
    pub llm_model: String,
    /// Embedding model id.
    pub embedding_model: String,
    /// Dimension of the embedding vectors; must match the collection.
    pub embedding_dimension: usize,
    /// Max texts per embedding request.
    pub embedding_batch_size: usize,
    /// Qdrant REST endpoint.
    pub qdrant_url: String,
    /// Collection holding all estimate points.
    pub qdrant_collection: String,
    /// Default number of search results.
    pub search_limit: usize,
    /// Mattermost REST API base (`.../api/v4`).
    pub mattermost_api_url: String,
    pub mattermost_bot_token: String,
    pub mattermost_webhook_url: String,
    pub log_dir: PathBuf,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
            gemini_base_url: env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            llm_model: env_or("LLM_MODEL", "gemini-2.0-flash"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-004"),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", 768),
            embedding_batch_size: env_parse("EMBEDDING_BATCH_SIZE", 100),
            qdrant_url: env_or("QDRANT_URL", "http://127.0.0.1:6333"),
            qdrant_collection: env_or("QDRANT_COLLECTION", "estimates"),
            search_limit: env_parse("SEARCH_LIMIT", 5),
            mattermost_api_url: env_or("MATTERMOST_API_URL", ""),
            mattermost_bot_token: env_or("MATTERMOST_BOT_TOKEN", ""),
            mattermost_webhook_url: env_or("MATTERMOST_INCOMING_WEBHOOK_URL", ""),
            log_dir: PathBuf::from(env_or("LOG_DIR", "logs")),
            port: env_parse("PORT", 8000),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<T>().ok())
        .unwrap_or(default)
}
