//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Default chat model used for proposal generation.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/pitch-credits").
    pub data_dir: String,

    /// OpenAI-compatible API base URL.
    pub openai_api_url: String,

    /// API key for the generation endpoint (optional; generation is
    /// unavailable without it).
    pub openai_api_key: Option<String>,

    /// Chat model used for proposal generation.
    pub openai_model: String,

    /// Credits charged per successful generation.
    pub generation_cost_credits: i64,

    /// Upper bound on one generation call, in seconds.
    pub generation_timeout_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// OpenAI secrets file structure.
#[derive(Debug, Deserialize)]
struct OpenAiSecrets {
    api_key: String,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (openai_api_url, openai_api_key, openai_model) = load_openai_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            openai_api_url: openai_api_url.unwrap_or(defaults.openai_api_url),
            openai_api_key,
            openai_model: openai_model.unwrap_or(defaults.openai_model),
            generation_cost_credits: env_parse("GENERATION_COST_CREDITS")
                .filter(|cost| *cost > 0)
                .unwrap_or(defaults.generation_cost_credits),
            generation_timeout_seconds: env_parse("GENERATION_TIMEOUT_SECONDS")
                .unwrap_or(defaults.generation_timeout_seconds),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Whether proposal generation can be offered.
    #[must_use]
    pub fn has_generator(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load OpenAI settings from file or environment.
///
/// Values in the secrets file take precedence.
fn load_openai_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/openai.json",
        "pitch-credits/.secrets/openai.json",
        "../.secrets/openai.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<OpenAiSecrets>(path) {
            tracing::info!(path = %path, "Loaded OpenAI secrets from file");
            return (
                secrets.api_url.or_else(|| std::env::var("OPENAI_API_URL").ok()),
                Some(secrets.api_key),
                secrets.model.or_else(|| std::env::var("OPENAI_MODEL").ok()),
            );
        }
    }

    tracing::debug!("OpenAI secrets file not found, using environment variables");
    (
        std::env::var("OPENAI_API_URL").ok(),
        std::env::var("OPENAI_API_KEY").ok(),
        std::env::var("OPENAI_MODEL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/pitch-credits".into(),
            openai_api_url: DEFAULT_OPENAI_API_URL.into(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            generation_cost_credits: 1,
            generation_timeout_seconds: 60,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_charge_one_credit() {
        let config = ServiceConfig::default();
        assert_eq!(config.generation_cost_credits, 1);
        assert_eq!(config.openai_model, "gpt-3.5-turbo");
        assert!(!config.has_generator());
    }

    #[test]
    fn secrets_file_parses_with_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openai.json");
        std::fs::write(&path, r#"{"api_key":"sk-test"}"#).unwrap();

        let secrets: OpenAiSecrets = load_secrets_file(path.to_str().unwrap()).unwrap();

        assert_eq!(secrets.api_key, "sk-test");
        assert!(secrets.api_url.is_none());
        assert!(load_secrets_file::<OpenAiSecrets>("/nonexistent/openai.json").is_err());
    }
}
