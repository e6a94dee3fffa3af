use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Redis connection URL (catalog lookup cache)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Anthropic API key; may be overridden per request via `X-Anthropic-Key`
    #[serde(default)]
    pub anthropic_api_key: String,

    /// Anthropic API base URL
    #[serde(default = "default_anthropic_api_url")]
    pub anthropic_api_url: String,

    /// Model identifier used for collection generation
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// TMDB API key; may be overridden per request via `X-TMDB-Key`
    #[serde(default)]
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_database_url() -> String {
    "sqlite:data/reelvault.db".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_anthropic_api_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
