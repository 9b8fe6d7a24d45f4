//! Configuration management for the application
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, time::Duration};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment prefix for every configuration key
pub const ENV_PREFIX: &str = "CHANSPAN_";

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "CHANSPAN_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Message store connection settings.
///
/// Credentials only ever arrive through the environment or a config file.
/// The password is redacted from `Debug` output and wiped on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    /// Upper bound for one span computation: connect, query and close
    pub timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            name: "mattermost".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("name", &self.name)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging format: "json" or "text"
    pub format: String,
    /// Default log level if no RUST_LOG is set
    pub default_level: String,
    /// Custom filter for dependency logs
    pub dependency_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            default_level: "info".to_string(),
            dependency_filter: Some("sqlx=warn,tokio_util=warn,mio=warn,rustls=warn".to_string()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv().ok();

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        // The config file location itself can only come from the environment
        if let Some(config_path) = std::env::var_os(CONFIG_PATH_ENV) {
            let path = Path::new(&config_path);
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            } else {
                return Err(ConfigError::LoadError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::MissingConfig("Database host is required".to_string()));
        }

        if self.database.user.trim().is_empty() {
            return Err(ConfigError::MissingConfig("Database user is required".to_string()));
        }

        if self.database.name.trim().is_empty() {
            return Err(ConfigError::MissingConfig("Database name is required".to_string()));
        }

        if self.database.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "database.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        match self.logging.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::InvalidValue(format!(
                "logging.format must be \"json\" or \"text\", got {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.port, 5432);
        assert!(config.database.password.is_none());
        assert_eq!(config.database.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("CHANSPAN_DATABASE__HOST", "db.internal");
            jail.set_env("CHANSPAN_DATABASE__PORT", "6543");
            jail.set_env("CHANSPAN_DATABASE__PASSWORD", "hunter2");
            jail.set_env("CHANSPAN_LOGGING__FORMAT", "json");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.database.host, "db.internal");
            assert_eq!(config.database.port, 6543);
            assert_eq!(config.database.password.as_deref(), Some("hunter2"));
            assert_eq!(config.logging.format, "json");
            // Untouched keys keep their defaults
            assert_eq!(config.database.name, "mattermost");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_is_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "chanspan.toml",
                r#"
                [database]
                host = "from-file"
                name = "chat"
                timeout_seconds = 3
                "#,
            )?;
            jail.set_env("CHANSPAN_CONFIG", "chanspan.toml");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.database.host, "from-file");
            assert_eq!(config.database.name, "chat");
            assert_eq!(config.database.timeout_seconds, 3);
            Ok(())
        });
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("CHANSPAN_CONFIG", "nope.toml");
            assert!(matches!(Config::load(), Err(ConfigError::LoadError(_))));
            Ok(())
        });
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = DatabaseConfig::default();
        config.password = Some("s3cret-value".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret-value"));
        assert!(rendered.contains("********"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.database.timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = Config::default();
        config.database.host = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(_))));

        let mut config = Config::default();
        config.logging.format = "yaml".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
