//! Bridge configuration
//!
//! Plain values only. Parsing and rendering work on strings; reading and
//! writing the file is left to the binaries.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::constants::*;
use crate::error::ConfigError;
use crate::protocol::{Endpoint, TagList};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Newline-delimited tag list
    pub tags: String,
    pub sender: SenderConfig,
    pub receiver: ReceiverConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tags: DEFAULT_TAG.to_string(),
            sender: SenderConfig::default(),
            receiver: ReceiverConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sender.port == 0 {
            return Err(ConfigError::InvalidPort(self.sender.port));
        }
        if self.sender.host.trim().is_empty() {
            return Err(ConfigError::InvalidAddress(self.sender.host.clone()));
        }
        if !self.receiver.group.is_multicast() {
            return Err(ConfigError::InvalidAddress(self.receiver.group.to_string()));
        }
        Ok(())
    }

    pub fn tag_list(&self) -> TagList {
        TagList::from_lines(&self.tags)
    }

    /// Per-user config file location, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "midi-osc-bridge")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Unicast destination settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SEND_HOST.to_string(),
            port: DEFAULT_SEND_PORT,
        }
    }
}

impl SenderConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

/// Multicast group settings, fixed for the life of a receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    /// Local interface used to join the group
    pub interface: Ipv4Addr,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_MULTICAST_GROUP,
            port: DEFAULT_MULTICAST_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.sender.endpoint(), Endpoint::new("127.0.0.1", 8000));
        assert_eq!(config.receiver.group, Ipv4Addr::new(239, 255, 0, 1));
        assert_eq!(config.receiver.port, 9000);
        assert_eq!(config.tag_list().as_slice(), &["piano"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = BridgeConfig::default();
        config.sender.host = "10.0.0.5".to_string();
        config.sender.port = 9100;
        config.tags = "piano\nlead".to_string();

        let text = config.to_toml_string().unwrap();
        let parsed = BridgeConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BridgeConfig::from_toml_str("[sender]\nport = 7000\n").unwrap();
        assert_eq!(config.sender.port, 7000);
        assert_eq!(config.sender.host, "127.0.0.1");
        assert_eq!(config.receiver.port, 9000);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            BridgeConfig::from_toml_str("[sender]\nport = 0\n"),
            Err(ConfigError::InvalidPort(0))
        ));
        assert!(matches!(
            BridgeConfig::from_toml_str("[receiver]\ngroup = \"10.0.0.1\"\n"),
            Err(ConfigError::InvalidAddress(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml_str("[sender]\nport = 70000\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
