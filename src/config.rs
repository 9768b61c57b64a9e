use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{Result, RelayError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub primary: PrimaryConfig,
    pub fallback: FallbackConfig,
    pub passthrough: PassthroughConfig,
    pub proxy: ProxyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `access-control-allow-origin` on translation endpoints
    pub allow_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum spacing between two requests from the same caller
    pub spacing_ms: u64,
    /// How often stale caller entries are swept
    pub sweep_interval_secs: u64,
    /// Entries idle for longer than this are evicted
    pub idle_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Inference API base URL; the model id is appended as a path
    pub endpoint: String,
    /// Translation model served by the inference API
    pub model: String,
    /// Bearer token. Usually supplied through `HF_TOKEN`
    pub token: Option<String>,
    /// Total attempts per line, including the first
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms`
    pub base_delay_ms: u64,
    /// Optional per-request timeout. None keeps the transport default
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// MyMemory `get` endpoint
    pub endpoint: String,
    /// Optional email sent as `de=` to raise the daily quota
    pub email: Option<String>,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassthroughConfig {
    /// LibreTranslate-compatible `/translate` URL
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// User-Agent sent upstream when the caller does not provide one
    pub default_user_agent: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Include per-line provider provenance in batch responses
    pub expose_providers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            spacing_ms: 600,
            sweep_interval_secs: 60,
            idle_ttl_secs: 300,
        }
    }
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".to_string(),
            model: "facebook/nllb-200-distilled-600M".to_string(),
            token: None,
            max_attempts: 3,
            base_delay_ms: 400,
            timeout_secs: None,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mymemory.translated.net/get".to_string(),
            email: None,
            max_attempts: 1,
        }
    }
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            url: "https://libretranslate.com/translate".to_string(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            default_user_agent: "Spicetify".to_string(),
        }
    }
}

impl RateLimitConfig {
    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_ms)
    }
}

impl PrimaryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// The configured token, treating an empty string as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RelayError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Override settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| env::var(key).ok());
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("HF_TOKEN") {
            self.primary.token = Some(token);
        }
        if let Some(origin) = lookup("CORS_ORIGIN") {
            self.cors.allow_origin = origin;
        }
        if let Some(rate) = lookup("RATE_MS") {
            match rate.parse() {
                Ok(ms) => self.rate_limit.spacing_ms = ms,
                Err(_) => warn!("Ignoring non-numeric RATE_MS value: {}", rate),
            }
        }
        if let Some(email) = lookup("MYMEMORY_EMAIL") {
            self.fallback.email = Some(email).filter(|e| !e.is_empty());
        }
        if let Some(url) = lookup("LT_URL") {
            self.passthrough.url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cors.allow_origin, "*");
        assert_eq!(config.rate_limit.spacing_ms, 600);
        assert_eq!(config.primary.max_attempts, 3);
        assert_eq!(config.primary.base_delay(), Duration::from_millis(400));
        assert_eq!(config.fallback.max_attempts, 1);
        assert!(config.primary.token().is_none());
        assert!(!config.output.expose_providers);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HF_TOKEN", "hf_secret"),
            ("CORS_ORIGIN", "https://open.spotify.com"),
            ("RATE_MS", "250"),
            ("MYMEMORY_EMAIL", "me@example.com"),
            ("LT_URL", "http://localhost:5000/translate"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.primary.token(), Some("hf_secret"));
        assert_eq!(config.cors.allow_origin, "https://open.spotify.com");
        assert_eq!(config.rate_limit.spacing_ms, 250);
        assert_eq!(config.fallback.email.as_deref(), Some("me@example.com"));
        assert_eq!(config.passthrough.url, "http://localhost:5000/translate");
    }

    #[test]
    fn test_bad_rate_is_ignored() {
        let mut config = Config::default();
        config.apply_vars(|key| (key == "RATE_MS").then(|| "soon".to_string()));
        assert_eq!(config.rate_limit.spacing_ms, 600);
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let mut config = Config::default();
        config.primary.token = Some(String::new());
        assert!(config.primary.token().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.server.port = 8787;
        config.output.expose_providers = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 8787);
        assert!(loaded.output.expose_providers);
        assert_eq!(loaded.primary.model, "facebook/nllb-200-distilled-600M");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cors]\nallow_origin = \"https://example.com\"\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.cors.allow_origin, "https://example.com");
        assert_eq!(loaded.rate_limit.spacing_ms, 600);
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[primary]\ntoken = \"hf_x\"\n\n[server]\nport = 8080\n\n[rate_limit]\nspacing_ms = 250\n",
        )
        .unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.primary.token(), Some("hf_x"));
        assert_eq!(loaded.primary.endpoint, "https://api-inference.huggingface.co/models");
        assert_eq!(loaded.primary.max_attempts, 3);
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.server.bind, "0.0.0.0");
        assert_eq!(loaded.rate_limit.spacing_ms, 250);
        assert_eq!(loaded.rate_limit.idle_ttl_secs, 300);
        assert_eq!(loaded.fallback.max_attempts, 1);
    }
}
