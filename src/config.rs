//! Connection and server settings, loadable from TOML.

use crate::{nbt::NETWORK_BUDGET, protocol::MAX_FRAME_LENGTH};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Settings applied to every connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// A connection with no inbound bytes for this long is timed out.
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,
    /// Frames at least this large are compressed once compression is
    /// negotiated. Negative disables compression.
    pub compression_threshold: i32,
    /// Byte budget for each tag tree decoded from the network.
    pub nbt_budget_bytes: u64,
    /// Largest frame accepted from the peer.
    pub max_frame_length: usize,
    /// Ticks between recomputations of the smoothed packet rates.
    pub stats_interval_ticks: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            compression_threshold: 256,
            nbt_budget_bytes: NETWORK_BUDGET,
            max_frame_length: MAX_FRAME_LENGTH,
            stats_interval_ticks: 20,
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.read_timeout.is_zero() {
            errors.push("read_timeout must be greater than zero".to_owned());
        }
        if self.max_frame_length == 0 || self.max_frame_length > MAX_FRAME_LENGTH {
            errors.push(format!("max_frame_length must be in 1..={MAX_FRAME_LENGTH}"));
        }
        if self.nbt_budget_bytes == 0 {
            errors.push("nbt_budget_bytes must be greater than zero".to_owned());
        }
        if self.stats_interval_ticks == 0 {
            errors.push("stats_interval_ticks must be greater than zero".to_owned());
        }
        errors
    }
}

/// Settings for a listening server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
    /// Shown in the server list.
    pub motd: String,
    pub max_players: u32,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    pub connection: ConnectionConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:25565".to_owned(),
            motd: "A Minecraft Server".to_owned(),
            max_players: 20,
            tick_rate: 20,
            connection: ConnectionConfig::default(),
        }
    }
}

impl NetworkConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&fs_err::read_to_string(path.as_ref())?)
    }

    /// Returns every problem found; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.connection.validate();
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("bind_address '{}' is not a socket address", self.bind_address));
        }
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            errors.push("tick_rate must be in 1..=1000".to_owned());
        }
        errors
    }
}

/// Durations as integer milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = NetworkConfig::from_toml(
            r#"
            bind_address = "127.0.0.1:25570"

            [connection]
            read_timeout = 5000
            compression_threshold = -1
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:25570");
        assert_eq!(config.max_players, 20);
        assert_eq!(config.connection.read_timeout, Duration::from_secs(5));
        assert_eq!(config.connection.compression_threshold, -1);
        assert_eq!(config.connection.nbt_budget_bytes, NETWORK_BUDGET);
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut config = NetworkConfig::default();
        config.bind_address = "nowhere".to_owned();
        config.connection.max_frame_length = 0;
        config.tick_rate = 0;
        assert_eq!(config.validate().len(), 3);
        assert!(matches!(
            NetworkConfig::from_toml("tick_rate = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&NetworkConfig::default()).unwrap();
        assert_eq!(NetworkConfig::from_toml(&text).unwrap(), NetworkConfig::default());
    }
}
