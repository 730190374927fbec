//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RPCLITE_CONFIG)
//! 3. Environment variables

use rpclite_core::SessionConfig;
use rpclite_protocol::{WireMode, MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 11223;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Wire protocol configuration.
    pub protocol: ProtocolConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RPCLITE_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.network.apply_overrides(&lookup);
        self.protocol.apply_overrides(&lookup);
    }

    /// Checks limits that would make the server unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.protocol.max_payload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_payload_bytes must be at least 1".to_string(),
            ));
        }
        if self.protocol.max_payload_bytes > i32::MAX as u32 {
            return Err(ConfigError::ValidationError(format!(
                "max_payload_bytes {} exceeds the i32 frame length limit",
                self.protocol.max_payload_bytes
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Idle connection timeout in seconds (0 = never).
    pub idle_timeout_secs: u64,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            idle_timeout_secs: 300,
            max_connections: 1000,
        }
    }
}

impl NetworkConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("RPCLITE_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Some(timeout) = lookup("RPCLITE_IDLE_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.idle_timeout_secs = secs;
            }
        }

        if let Some(max) = lookup("RPCLITE_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }

    /// Returns idle timeout as Duration.
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Wire protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Argument encoding; clients must use the same mode.
    pub wire_mode: WireMode,
    /// Largest call payload accepted.
    pub max_payload_bytes: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            wire_mode: WireMode::SelfFramed,
            max_payload_bytes: MAX_PAYLOAD_SIZE,
        }
    }
}

impl ProtocolConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("RPCLITE_WIRE_MODE") {
            if let Ok(parsed) = mode.parse() {
                self.wire_mode = parsed;
            }
        }

        if let Some(max) = lookup("RPCLITE_MAX_PAYLOAD") {
            if let Ok(n) = max.parse() {
                self.max_payload_bytes = n;
            }
        }
    }

    /// Returns the per-connection session configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .with_wire_mode(self.wire_mode)
            .with_max_payload(self.max_payload_bytes)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// `SocketAddr` as a plain string in YAML.
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.bind_addr.port(), 11223);
        assert_eq!(config.network.idle_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.protocol.wire_mode, WireMode::SelfFramed);
        assert_eq!(config.protocol.max_payload_bytes, 16 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "network:\n  bind_addr: \"0.0.0.0:9000\"\nprotocol:\n  wire_mode: compact"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.bind_addr.port(), 9000);
        assert_eq!(config.network.max_connections, 1000);
        assert_eq!(config.protocol.wire_mode, WireMode::Compact);
    }

    #[test]
    fn test_from_file_errors() {
        let err = Config::from_file("/nonexistent/rpclite.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
        assert!(err.to_string().contains("/nonexistent/rpclite.yaml"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "network:\n  bind_addr: \"not an address\"").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RPCLITE_BIND", "127.0.0.1:4000"),
            ("RPCLITE_IDLE_TIMEOUT", "0"),
            ("RPCLITE_MAX_CONNECTIONS", "not-a-number"),
            ("RPCLITE_WIRE_MODE", "compact"),
            ("RPCLITE_MAX_PAYLOAD", "4096"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.network.bind_addr.port(), 4000);
        assert_eq!(config.network.idle_timeout(), None);
        assert_eq!(config.network.max_connections, 1000);
        assert_eq!(config.protocol.wire_mode, WireMode::Compact);

        let session = config.protocol.session_config();
        assert_eq!(session.max_payload, 4096);
        assert_eq!(session.wire_mode, WireMode::Compact);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.network.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.protocol.max_payload_bytes = 0;
        assert!(config.validate().is_err());

        config.protocol.max_payload_bytes = u32::MAX;
        assert!(config.validate().is_err());

        config.protocol.max_payload_bytes = i32::MAX as u32;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.protocol.wire_mode = WireMode::Compact;
        config.save(file.path()).unwrap();

        let parsed = Config::from_file(file.path()).unwrap();
        assert_eq!(parsed.network.bind_addr, config.network.bind_addr);
        assert_eq!(parsed.protocol.wire_mode, WireMode::Compact);
    }
}
