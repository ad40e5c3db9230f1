//! LLM configuration layering.
//!
//! Each field resolves independently: command-line flag, then `COMMITY_*`
//! environment variable, then `~/.commity/config.json`, then the default.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::llm::Provider;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 3000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "COMMITY_";

/// Fully resolved and validated provider configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
    pub debug: bool,
}

impl LlmConfig {
    /// Defaults for `provider`, without an API key.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: None,
            debug: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::NotPositive { field: "max_tokens" });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::NotPositive { field: "timeout" });
        }
        let has_key = self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if self.provider.requires_api_key() && !has_key {
            return Err(ConfigError::MissingApiKey(self.provider.to_string()));
        }
        Ok(())
    }
}

/// Human-readable listing with the API key masked.
impl fmt::Display for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "provider:    {}", self.provider)?;
        writeln!(f, "base_url:    {}", self.base_url)?;
        writeln!(f, "model:       {}", self.model)?;
        if let Some(key) = &self.api_key {
            writeln!(f, "api_key:     {}", mask_secret(key))?;
        }
        writeln!(f, "temperature: {}", self.temperature)?;
        writeln!(f, "max_tokens:  {}", self.max_tokens)?;
        writeln!(f, "timeout:     {}s", self.timeout_secs)?;
        if let Some(proxy) = &self.proxy {
            writeln!(f, "proxy:       {proxy}")?;
        }
        write!(f, "debug:       {}", self.debug)
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// One source of configuration values; unset fields defer to later layers.
///
/// Config files use upper-case keys (`PROVIDER`, `BASE_URL`, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ConfigLayer {
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub debug: Option<bool>,
}

impl ConfigLayer {
    /// Fill unset fields from `fallback`.
    pub fn or(self, fallback: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            provider: self.provider.or(fallback.provider),
            base_url: self.base_url.or(fallback.base_url),
            model: self.model.or(fallback.model),
            api_key: self.api_key.or(fallback.api_key),
            temperature: self.temperature.or(fallback.temperature),
            max_tokens: self.max_tokens.or(fallback.max_tokens),
            timeout: self.timeout.or(fallback.timeout),
            proxy: self.proxy.or(fallback.proxy),
            debug: self.debug.or(fallback.debug),
        }
    }

    /// Read `COMMITY_*` environment variables. Empty values count as unset.
    pub fn from_env() -> Result<ConfigLayer, ConfigError> {
        Ok(ConfigLayer {
            provider: env_string("PROVIDER"),
            base_url: env_string("BASE_URL"),
            model: env_string("MODEL"),
            api_key: env_string("API_KEY"),
            temperature: env_parsed("TEMPERATURE")?,
            max_tokens: env_parsed("MAX_TOKENS")?,
            timeout: env_parsed("TIMEOUT")?,
            proxy: env_string("PROXY"),
            debug: env_flag("DEBUG")?,
        })
    }

    /// Apply defaults and validate.
    pub fn resolve(self) -> Result<LlmConfig, ConfigError> {
        let provider = match self.provider.as_deref() {
            Some(name) => name
                .parse::<Provider>()
                .map_err(ConfigError::UnsupportedProvider)?,
            None => Provider::default(),
        };

        let defaults = LlmConfig::for_provider(provider);
        let config = LlmConfig {
            provider,
            base_url: self.base_url.unwrap_or(defaults.base_url),
            model: self.model.unwrap_or(defaults.model),
            api_key: self.api_key,
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            timeout_secs: self.timeout.unwrap_or(defaults.timeout_secs),
            proxy: self.proxy,
            debug: self.debug.unwrap_or(defaults.debug),
        };
        config.validate()?;
        Ok(config)
    }
}

/// `~/.commity/config.json`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".commity").join("config.json"))
}

/// Load a config file layer.
///
/// A missing file is an empty layer. Unreadable or malformed files are
/// reported with a warning and also treated as empty.
pub fn load_config_file(path: &Path) -> ConfigLayer {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file");
            return ConfigLayer::default();
        }
        Err(e) => {
            warn!("Could not read config file {}: {}", path.display(), e);
            return ConfigLayer::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(layer) => layer,
        Err(e) => {
            warn!("Could not decode JSON from {}: {}", path.display(), e);
            ConfigLayer::default()
        }
    }
}

/// Resolve the configuration from command-line values, the environment and
/// the default config file.
pub fn load(cli: ConfigLayer) -> Result<LlmConfig, ConfigError> {
    let file = default_config_path()
        .map(|path| load_config_file(&path))
        .unwrap_or_default();
    cli.or(ConfigLayer::from_env()?).or(file).resolve()
}

fn env_string(field: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{field}"))
        .ok()
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(field: &str) -> Result<Option<T>, ConfigError> {
    let Some(value) = env_string(field) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvValue {
            var: format!("{ENV_PREFIX}{field}"),
            value,
        })
}

fn env_flag(field: &str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = env_string(field) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidEnvValue {
            var: format!("{ENV_PREFIX}{field}"),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 9] = [
        "COMMITY_PROVIDER",
        "COMMITY_BASE_URL",
        "COMMITY_MODEL",
        "COMMITY_API_KEY",
        "COMMITY_TEMPERATURE",
        "COMMITY_MAX_TOKENS",
        "COMMITY_TIMEOUT",
        "COMMITY_PROXY",
        "COMMITY_DEBUG",
    ];

    /// Run `f` with every `COMMITY_*` variable unset except those given.
    fn with_env<R>(set: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let vars: Vec<(&str, Option<&str>)> = ALL_VARS
            .iter()
            .map(|name| {
                let value = set.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(vars, f)
    }

    fn ollama(base_url: &str) -> ConfigLayer {
        ConfigLayer {
            provider: Some("ollama".to_string()),
            base_url: Some(base_url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_defaults() {
        let config = ollama("http://localhost:11434").resolve().unwrap();
        assert_eq!(config.provider, Provider::Ollama);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 3000);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_temperature_validation() {
        for ok in [0.0, 0.5, 1.0] {
            let layer = ConfigLayer {
                temperature: Some(ok),
                ..ollama("http://localhost")
            };
            assert!(layer.resolve().is_ok());
        }

        let err = ConfigLayer {
            temperature: Some(1.5),
            ..ollama("http://localhost")
        }
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains("less than or equal to 1"));

        let err = ConfigLayer {
            temperature: Some(-0.1),
            ..ollama("http://localhost")
        }
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains("greater than or equal to 0"));
    }

    #[test]
    fn test_max_tokens_and_timeout_must_be_positive() {
        let err = ConfigLayer {
            max_tokens: Some(0),
            ..ollama("http://localhost")
        }
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains("greater than 0"));

        let err = ConfigLayer {
            timeout: Some(0),
            ..ollama("http://localhost")
        }
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_api_key_required_except_for_ollama() {
        for provider in ["openai", "gemini", "openrouter", "nvidia"] {
            let err = ConfigLayer {
                provider: Some(provider.to_string()),
                ..Default::default()
            }
            .resolve()
            .unwrap_err();
            assert!(err.to_string().contains("API key must be specified"));
        }

        let config = ConfigLayer {
            provider: Some("openai".to_string()),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = ConfigLayer {
            provider: Some("unknown".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(ref p) if p == "unknown"));
    }

    #[test]
    fn test_load_existing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"PROVIDER": "ollama", "MODEL": "qwen2", "TEMPERATURE": 0.5, "MAX_TOKENS": 1000}"#,
        )
        .unwrap();

        let layer = load_config_file(&path);
        assert_eq!(layer.provider.as_deref(), Some("ollama"));
        assert_eq!(layer.model.as_deref(), Some("qwen2"));
        assert_eq!(layer.temperature, Some(0.5));
        assert_eq!(layer.max_tokens, Some(1000));
        assert_eq!(layer.base_url, None);
    }

    #[test]
    fn test_load_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let layer = load_config_file(&dir.path().join("nonexistent.json"));
        assert_eq!(layer, ConfigLayer::default());
    }

    #[test]
    fn test_load_invalid_json_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ invalid json }").unwrap();
        assert_eq!(load_config_file(&path), ConfigLayer::default());
    }

    #[test]
    #[serial]
    fn test_defaults_with_empty_environment() {
        with_env(&[], || {
            let cli = ConfigLayer {
                api_key: Some("test-key".to_string()),
                ..Default::default()
            };
            let config = cli.or(ConfigLayer::from_env().unwrap()).resolve().unwrap();
            assert_eq!(config.provider, Provider::Gemini);
            assert_eq!(config.model, "gemini-2.5-flash");
            assert_eq!(config.temperature, 0.3);
            assert_eq!(config.max_tokens, 3000);
            assert_eq!(config.timeout_secs, 60);
        });
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        let vars = [
            ("COMMITY_PROVIDER", "ollama"),
            ("COMMITY_BASE_URL", "http://env:11434"),
            ("COMMITY_MODEL", "env-model"),
            ("COMMITY_TEMPERATURE", "0.6"),
            ("COMMITY_MAX_TOKENS", "2500"),
            ("COMMITY_TIMEOUT", "50"),
            ("COMMITY_DEBUG", "true"),
        ];
        with_env(&vars, || {
            let config = ConfigLayer::from_env().unwrap().resolve().unwrap();
            assert_eq!(config.provider, Provider::Ollama);
            assert_eq!(config.base_url, "http://env:11434");
            assert_eq!(config.model, "env-model");
            assert_eq!(config.temperature, 0.6);
            assert_eq!(config.max_tokens, 2500);
            assert_eq!(config.timeout_secs, 50);
            assert!(config.debug);
        });
    }

    #[test]
    #[serial]
    fn test_cli_over_env_over_file() {
        let vars = [
            ("COMMITY_PROVIDER", "openai"),
            ("COMMITY_BASE_URL", "http://env:11434"),
            ("COMMITY_MODEL", "env-model"),
        ];
        with_env(&vars, || {
            let file = ConfigLayer {
                model: Some("file-model".to_string()),
                timeout: Some(15),
                ..Default::default()
            };
            let config = ollama("http://args:11434")
                .or(ConfigLayer::from_env().unwrap())
                .or(file)
                .resolve()
                .unwrap();
            assert_eq!(config.provider, Provider::Ollama);
            assert_eq!(config.base_url, "http://args:11434");
            assert_eq!(config.model, "env-model");
            assert_eq!(config.timeout_secs, 15);
        });
    }

    #[test]
    #[serial]
    fn test_invalid_env_number_names_variable() {
        with_env(&[("COMMITY_MAX_TOKENS", "lots")], || {
            let err = ConfigLayer::from_env().unwrap_err();
            assert_eq!(err.to_string(), "Invalid value 'lots' for COMMITY_MAX_TOKENS");
        });
    }

    #[test]
    #[serial]
    fn test_empty_env_value_is_unset() {
        with_env(&[("COMMITY_TIMEOUT", "")], || {
            assert_eq!(ConfigLayer::from_env().unwrap().timeout, None);
        });
    }

    #[test]
    fn test_display_masks_api_key() {
        let config = LlmConfig {
            api_key: Some("sk-1234567890abcdef".to_string()),
            ..LlmConfig::for_provider(Provider::OpenAi)
        };
        let shown = config.to_string();
        assert!(!shown.contains("sk-1234567890abcdef"));
        assert!(shown.contains("****cdef"));
        assert!(shown.contains("provider:    openai"));
    }
}
