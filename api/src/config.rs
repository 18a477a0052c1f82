//! Configuration module for the API server
//!
//! Supports loading configuration from a TOML file.

use hyperv_security::{ConnectionConfig, Credentials};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Server configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Hyper-V host settings
    #[serde(default)]
    pub hyperv: HypervConfig,
}

/// Server-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on (default: 6002)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level filter (default: "api=info,hyperv_security=info,tower_http=info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Target Hyper-V host
#[derive(Deserialize, Clone, Default)]
pub struct HypervConfig {
    /// Remote machine; local host when unset
    #[serde(default)]
    pub machine_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// PowerShell executable (default: powershell.exe)
    #[serde(default)]
    pub powershell_path: Option<String>,

    /// Per-command timeout in seconds (default: 60)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for HypervConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypervConfig")
            .field("machine_name", &self.machine_name)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("powershell_path", &self.powershell_path)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6002
}

fn default_log_level() -> String {
    "api=info,hyperv_security=info,tower_http=info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e.to_string()))
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Build the executor connection settings.
    pub fn connection(&self) -> Result<ConnectionConfig, ConfigError> {
        let hyperv = &self.hyperv;
        let mut connection = match hyperv.machine_name.as_deref() {
            Some(machine) if !machine.is_empty() => ConnectionConfig::remote(machine),
            _ => ConnectionConfig::local(),
        };

        match (&hyperv.username, &hyperv.password) {
            (Some(username), Some(password)) => {
                let credentials = match &hyperv.domain {
                    Some(domain) => Credentials::with_domain(domain, username, password),
                    None => Credentials::new(username, password),
                };
                connection = connection.with_credentials(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "hyperv.username and hyperv.password must be set together".to_string(),
                ))
            }
        }

        if let Some(ref path) = hyperv.powershell_path {
            connection = connection.with_powershell_path(path);
        }
        if let Some(secs) = hyperv.timeout_secs {
            connection = connection.with_timeout(Duration::from_secs(secs));
        }

        Ok(connection)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    ReadError(String, String),
    #[error("Failed to parse config file '{0}': {1}")]
    ParseError(String, String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 6002);
        assert_eq!(
            config.logging.level,
            "api=info,hyperv_security=info,tower_http=info"
        );
        assert!(config.hyperv.machine_name.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr(), "127.0.0.1:6002");
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [server]
            port = 8080
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1"); // default
        assert!(!config.connection().unwrap().is_remote());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [logging]
            level = "debug"

            [hyperv]
            machine_name = "hv01"
            domain = "CONTOSO"
            username = "admin"
            password = "secret"
            powershell_path = "pwsh"
            timeout_secs = 90
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");

        let connection = config.connection().unwrap();
        assert!(connection.is_remote());
        assert_eq!(connection.machine_name.as_deref(), Some("hv01"));
        assert_eq!(connection.powershell_path, "pwsh");
        assert_eq!(connection.timeout, Duration::from_secs(90));
        assert_eq!(
            connection.credentials.unwrap().full_username(),
            "CONTOSO\\admin"
        );
    }

    #[test]
    fn test_username_without_password_is_invalid() {
        let toml = r#"
            [hyperv]
            machine_name = "hv01"
            username = "admin"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.connection(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let toml = r#"
            [hyperv]
            username = "admin"
            password = "hunter2"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.server.port, 6002);
    }
}
