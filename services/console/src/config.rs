use async_openai::config::OpenAIConfig;
use kocho_core::{
    caption::DEFAULT_REVEAL_INTERVAL,
    llm_client::{GEMINI_API_BASE, OPENAI_API_BASE},
    pump::DEFAULT_POLL_INTERVAL,
};
use std::{path::PathBuf, time::Duration};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported dialogue engine backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => OPENAI_API_BASE,
            Provider::Gemini => GEMINI_API_BASE,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.5-flash",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub personas_path: PathBuf,
    pub scripts_path: PathBuf,
    pub videos_path: PathBuf,
    pub poll_interval: Duration,
    pub caption_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// API keys are not required here; they are checked by [`Config::dialogue_config`]
    /// when a conversation is actually started.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let provider_str =
            std::env::var("DIALOGUE_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "gemini" => Provider::Gemini,
            other => {
                return Err(ConfigError::InvalidValue(
                    "DIALOGUE_PROVIDER".to_string(),
                    format!("'{}' is not one of 'gemini' or 'openai'", other),
                ));
            }
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let chat_model = std::env::var("CHAT_MODEL")
            .unwrap_or_else(|_| provider.default_model().to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let path_var = |name: &str, default: &str| {
            std::env::var(name)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(default))
        };

        Ok(Self {
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            personas_path: path_var("PERSONAS_PATH", "./personas"),
            scripts_path: path_var("SCRIPTS_PATH", "./scripts"),
            videos_path: path_var("VIDEOS_PATH", "./videos"),
            poll_interval: millis_var("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL)?,
            caption_interval: millis_var("CAPTION_INTERVAL_MS", DEFAULT_REVEAL_INTERVAL)?,
        })
    }

    /// The API key for the configured provider.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        let key = match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
        };
        key.ok_or_else(|| {
            ConfigError::MissingVar(format!(
                "{} must be set for the '{:?}' provider",
                self.provider.key_var(),
                self.provider
            ))
        })
    }

    /// Client configuration for the dialogue engine.
    pub fn dialogue_config(&self) -> Result<OpenAIConfig, ConfigError> {
        Ok(OpenAIConfig::new()
            .with_api_key(self.api_key()?)
            .with_api_base(self.provider.api_base()))
    }
}

fn millis_var(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a positive number of milliseconds", raw),
            )),
            Ok(ms) => Ok(Duration::from_millis(ms)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("DIALOGUE_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("CHAT_MODEL");
            env::remove_var("RUST_LOG");
            env::remove_var("PERSONAS_PATH");
            env::remove_var("SCRIPTS_PATH");
            env::remove_var("VIDEOS_PATH");
            env::remove_var("POLL_INTERVAL_MS");
            env::remove_var("CAPTION_INTERVAL_MS");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.chat_model, "gemini-2.5-flash");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.personas_path, PathBuf::from("./personas"));
        assert_eq!(config.scripts_path, PathBuf::from("./scripts"));
        assert_eq!(config.videos_path, PathBuf::from("./videos"));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.caption_interval, Duration::from_millis(4000));
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.gemini_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("DIALOGUE_PROVIDER", "OpenAI");
            env::set_var("OPENAI_API_KEY", "custom-openai-key");
            env::set_var("CHAT_MODEL", "gpt-4o-mini");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PERSONAS_PATH", "/srv/kocho/personas");
            env::set_var("SCRIPTS_PATH", "/srv/kocho/scripts");
            env::set_var("VIDEOS_PATH", "/srv/kocho/videos");
            env::set_var("POLL_INTERVAL_MS", "50");
            env::set_var("CAPTION_INTERVAL_MS", "2500");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.personas_path, PathBuf::from("/srv/kocho/personas"));
        assert_eq!(config.scripts_path, PathBuf::from("/srv/kocho/scripts"));
        assert_eq!(config.videos_path, PathBuf::from("/srv/kocho/videos"));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.caption_interval, Duration::from_millis(2500));
        assert_eq!(config.api_key().unwrap(), "custom-openai-key");
    }

    #[test]
    #[serial]
    fn test_openai_provider_defaults_to_openai_model() {
        clear_env_vars();
        unsafe {
            env::set_var("DIALOGUE_PROVIDER", "openai");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.provider.api_base(), OPENAI_API_BASE);
    }

    #[test]
    #[serial]
    fn test_config_invalid_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("DIALOGUE_PROVIDER", "clippy");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "DIALOGUE_PROVIDER"),
            _ => panic!("Expected InvalidValue for DIALOGUE_PROVIDER"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_interval() {
        clear_env_vars();
        unsafe {
            env::set_var("CAPTION_INTERVAL_MS", "0");
        }
        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "CAPTION_INTERVAL_MS"),
            _ => panic!("Expected InvalidValue for CAPTION_INTERVAL_MS"),
        }

        unsafe {
            env::set_var("CAPTION_INTERVAL_MS", "soon");
        }
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_missing_gemini_key_reported_on_use() {
        clear_env_vars();

        let config = Config::from_env().expect("keys are not needed to load");
        let err = config.dialogue_config().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_gemini_key_present() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.api_key().unwrap(), "test-gemini-key");
        assert!(config.dialogue_config().is_ok());
    }
}
