//! Configuration management for chargebridge
//!
//! Loads the charger endpoint, register map and logging settings from YAML.
//! The `charger` section uses the same keys the settings UI stores
//! (`ipAddress`, `port`, `unitId`, `reconnectIntervalMs`).

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

pub use defaults::{
    DEFAULT_PORT, DEFAULT_RECONNECT_INTERVAL_MS, DEFAULT_UNIT_ID, MIN_RECONNECT_INTERVAL,
};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHARGEBRIDGE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Charger TCP endpoint and reconnect policy
    #[serde(default)]
    pub charger: ChargerConfig,

    /// Register addresses for the writable channels
    #[serde(default)]
    pub registers: RegistersConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Charger connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChargerConfig {
    /// Host name or IP address of the charger
    pub ip_address: String,

    /// TCP port (typically 502)
    pub port: u16,

    /// Unit id; read for diagnostics, never placed on the wire
    pub unit_id: u8,

    /// Delay between reconnect attempts in milliseconds
    #[serde(alias = "reconnectInterval")]
    pub reconnect_interval_ms: u32,
}

/// Register addresses targeted by the command router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistersConfig {
    /// Charging power limit, kW x 10
    pub max_charging_power: u16,

    /// Charging state (0 = standby, 1 = paused, 2 = charging)
    pub charging_control: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory for rolling log files; console only when unset
    pub file: Option<String>,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl ChargerConfig {
    /// Host and port to dial, or the fatal configuration error
    pub fn endpoint(&self) -> Result<(&str, u16)> {
        let host = self.ip_address.trim();
        if host.is_empty() || self.port == 0 {
            return Err(BridgeError::config(
                "IP address or port is not specified. Please check your configuration.",
            ));
        }
        Ok((host, self.port))
    }

    /// Period of the reconnect timer
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.reconnect_interval_ms)).max(MIN_RECONNECT_INTERVAL)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `$CHARGEBRIDGE_CONFIG` or the first default location found
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }

        let default_paths = [
            "chargebridge.yaml",
            "/data/chargebridge.yaml",
            "/etc/chargebridge/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Defaults leave the ip address empty; validate() reports it
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.charger.ip_address.trim().is_empty() {
            return Err(BridgeError::validation(
                "charger.ipAddress",
                "IP address cannot be empty",
            ));
        }

        if self.charger.port == 0 {
            return Err(BridgeError::validation(
                "charger.port",
                "Port must be greater than 0",
            ));
        }

        if self.registers.max_charging_power == self.registers.charging_control {
            return Err(BridgeError::validation(
                "registers",
                "max_charging_power and charging_control must differ",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level).map_err(|_| {
            BridgeError::validation("logging.level", "Unknown log level")
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.charger.port, 502);
        assert_eq!(config.charger.unit_id, 1);
        assert_eq!(config.charger.reconnect_interval_ms, 60_000);
        assert_eq!(config.registers.max_charging_power, 8192);
        assert_eq!(config.registers.charging_control, 8198);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.charger.ip_address = "10.0.0.5".to_string();
        assert!(config.validate().is_ok());

        config.charger.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_host_is_a_configuration_error() {
        let charger = ChargerConfig::default();
        let err = charger.endpoint().unwrap_err();
        assert!(matches!(err, BridgeError::Config { .. }));

        let charger = ChargerConfig {
            ip_address: "  ".to_string(),
            ..Default::default()
        };
        assert!(charger.endpoint().is_err());
    }

    #[test]
    fn zero_interval_is_floored() {
        let charger = ChargerConfig {
            reconnect_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(charger.reconnect_interval(), MIN_RECONNECT_INTERVAL);

        let charger = ChargerConfig {
            reconnect_interval_ms: 300_000,
            ..Default::default()
        };
        assert_eq!(charger.reconnect_interval(), Duration::from_secs(300));
    }

    #[test]
    fn charger_section_uses_settings_keys() {
        let yaml = "charger:\n  ipAddress: 10.0.0.5\n  reconnectInterval: 900000\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.charger.ip_address, "10.0.0.5");
        assert_eq!(config.charger.port, 502);
        assert_eq!(config.charger.unit_id, 1);
        assert_eq!(config.charger.reconnect_interval_ms, 900_000);
    }
}
