use std::path::PathBuf;

use nitrilens_core::ConcentrationUnit;
use tracing::warn;

/// NitriLens runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Gemini API key used when the caller supplies none
    pub api_key: Option<String>,
    /// Gemini model name
    pub model: String,
    /// Unit readings are reported in
    pub unit: ConcentrationUnit,
    /// Gemini API base URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Custom prompt template
    pub prompt_file: Option<PathBuf>,
    /// Directory for rolling NDJSON logs; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8501,
            api_key: None,
            model: "gemini-2.0-flash-exp".to_string(),
            unit: ConcentrationUnit::MgPerL,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
            prompt_file: None,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: non_empty("NITRILENS_BIND").unwrap_or(defaults.bind_address),
            port: non_empty("NITRILENS_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            api_key: non_empty("GEMINI_API_KEY"),
            model: non_empty("NITRILENS_MODEL").unwrap_or(defaults.model),
            unit: non_empty("NITRILENS_UNIT")
                .and_then(|u| match u.parse() {
                    Ok(unit) => Some(unit),
                    Err(e) => {
                        warn!(error = %e, "Ignoring NITRILENS_UNIT");
                        None
                    }
                })
                .unwrap_or(defaults.unit),
            base_url: non_empty("NITRILENS_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: non_empty("NITRILENS_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.timeout_secs),
            prompt_file: non_empty("NITRILENS_PROMPT_FILE").map(PathBuf::from),
            log_dir: non_empty("NITRILENS_LOG_DIR").map(PathBuf::from),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.port, 8501);
        assert_eq!(config.model, "gemini-2.0-flash-exp");
        assert_eq!(config.unit, ConcentrationUnit::MgPerL);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "abc"),
            ("NITRILENS_PORT", "9000"),
            ("NITRILENS_UNIT", "ppm"),
            ("NITRILENS_TIMEOUT_SECS", "15"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.unit, ConcentrationUnit::Ppm);
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn ignores_invalid_values() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "   "),
            ("NITRILENS_PORT", "not-a-port"),
            ("NITRILENS_UNIT", "grains"),
            ("NITRILENS_TIMEOUT_SECS", "0"),
        ]));
        assert!(config.api_key.is_none());
        assert_eq!(config.port, 8501);
        assert_eq!(config.unit, ConcentrationUnit::MgPerL);
        assert_eq!(config.timeout_secs, 60);
    }
}
