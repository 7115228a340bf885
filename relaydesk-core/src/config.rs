//! Configuration management

use crate::error::{ErrorContext, RelayDeskError, RelayDeskResult};
use crate::types::{ApiConfig, ConsoleConfig, SessionConfig, StorageConfig};

use std::path::{Path, PathBuf};

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            timeout_seconds: 30,
            user_agent: format!("relaydesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.relaydesk".to_string(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            logging: crate::logging::LoggingConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RelayDeskResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RelayDeskError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ConsoleConfig = toml::from_str(&content).map_err(|e| RelayDeskError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RelayDeskResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| RelayDeskError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content).map_err(|e| RelayDeskError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> RelayDeskResult<()> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| RelayDeskError::Config {
            message: format!("Invalid api.base_url '{}': {}", self.api.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion("Use an absolute URL such as https://relay.example.com/api/v1"),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RelayDeskError::Config {
                message: format!("Unsupported api.base_url scheme: {}", parsed.scheme()),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Use http or https"),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(RelayDeskError::Config {
                message: "api.timeout_seconds must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.timeout_seconds to a positive value"),
            });
        }

        if self.session.refresh_interval_secs == 0 {
            return Err(RelayDeskError::Config {
                message: "session.refresh_interval_secs must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set session.refresh_interval_secs to a positive value"),
            });
        }

        if self.session.logout_timeout_ms == 0 {
            return Err(RelayDeskError::Config {
                message: "session.logout_timeout_ms must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set session.logout_timeout_ms to a positive value"),
            });
        }

        Ok(())
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("relaydesk")
            .join("config.toml")
    }

    /// Candidate locations searched when no explicit path is given, in order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_path()];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".relaydesk").join("config.toml"));
        }
        paths.push(PathBuf::from("relaydesk.toml"));
        paths
    }

    /// Load from `path`, or from the first existing search path, or fall back to defaults
    pub fn load(path: Option<&Path>) -> RelayDeskResult<Self> {
        if let Some(path) = path {
            tracing::info!("Loading configuration from {:?}", path);
            return Self::from_file(path);
        }

        for candidate in Self::search_paths() {
            if candidate.exists() {
                tracing::info!("Loading configuration from {:?}", candidate);
                return Self::from_file(candidate);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.refresh_interval_secs, 60);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ConsoleConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(RelayDeskError::Config { .. })));

        let mut config = ConsoleConfig::default();
        config.api.base_url = "ftp://relay.example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::default();
        config.session.refresh_interval_secs = 0;
        match config.validate() {
            Err(RelayDeskError::Config { message, .. }) => {
                assert!(message.contains("refresh_interval_secs"));
            }
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ConsoleConfig::default();
        config.api.base_url = "https://relay.example.com/api/v1".to_string();
        config.session.refresh_interval_secs = 15;
        config.save_to_file(&path).unwrap();

        let loaded = ConsoleConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.api.base_url, "https://relay.example.com/api/v1");
        assert_eq!(loaded.session.refresh_interval_secs, 15);
    }

    #[test]
    fn test_missing_logging_section_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://relay.example.com/api/v1"
timeout_seconds = 10
user_agent = "relaydesk-test"

[session]
refresh_interval_secs = 60
logout_timeout_ms = 1000

[storage]
data_dir = "/tmp/relaydesk"
"#,
        )
        .unwrap();

        let loaded = ConsoleConfig::from_file(&path).unwrap();
        assert_eq!(loaded.logging.level, "info");
        assert_eq!(
            loaded.storage.resolved_data_dir(),
            PathBuf::from("/tmp/relaydesk")
        );
    }
}
