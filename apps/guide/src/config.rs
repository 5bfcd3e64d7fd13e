use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub reference_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
    pub generation_timeout: Duration,
    pub retrieval_top_k: usize,
    /// Sessions unused for this long are dropped.
    pub session_idle_ttl: Duration,
    /// Attach operator diagnostics to answers returned over HTTP.
    pub expose_diagnostics: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").with_context(|| {
                "Required environment variable 'ANTHROPIC_API_KEY' is not set".to_string()
            })?,
            reference_dir: PathBuf::from(var("REFERENCE_DIR", "context")),
            port: var("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
            generation_timeout: Duration::from_secs(
                var("GENERATION_TIMEOUT_SECS", "60")
                    .parse::<u64>()
                    .context("GENERATION_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            retrieval_top_k: var("RETRIEVAL_TOP_K", "3")
                .parse::<usize>()
                .context("RETRIEVAL_TOP_K must be a non-negative integer")?,
            session_idle_ttl: Duration::from_secs(
                var("SESSION_IDLE_TTL_SECS", "3600")
                    .parse::<u64>()
                    .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?,
            ),
            expose_diagnostics: parse_bool(&var("EXPOSE_DIAGNOSTICS", "false"))
                .context("EXPOSE_DIAGNOSTICS must be true or false")?,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => anyhow::bail!("'{other}' is not a boolean"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.reference_dir, PathBuf::from("context"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
        assert_eq!(config.retrieval_top_k, 3);
        assert_eq!(config.session_idle_ttl, Duration::from_secs(3600));
        assert!(!config.expose_diagnostics);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("REFERENCE_DIR", "/srv/guide"),
            ("PORT", "9000"),
            ("GENERATION_TIMEOUT_SECS", "15"),
            ("RETRIEVAL_TOP_K", "5"),
            ("SESSION_IDLE_TTL_SECS", "900"),
            ("EXPOSE_DIAGNOSTICS", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.reference_dir, PathBuf::from("/srv/guide"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.generation_timeout, Duration::from_secs(15));
        assert_eq!(config.retrieval_top_k, 5);
        assert_eq!(config.session_idle_ttl, Duration::from_secs(900));
        assert!(config.expose_diagnostics);
    }

    #[test]
    fn test_invalid_values_fail_with_context() {
        let err = config_from(&[("ANTHROPIC_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err =
            config_from(&[("ANTHROPIC_API_KEY", "k"), ("EXPOSE_DIAGNOSTICS", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("EXPOSE_DIAGNOSTICS"));

        let err =
            config_from(&[("ANTHROPIC_API_KEY", "k"), ("RETRIEVAL_TOP_K", "-1")]).unwrap_err();
        assert!(err.to_string().contains("RETRIEVAL_TOP_K"));
    }
}
