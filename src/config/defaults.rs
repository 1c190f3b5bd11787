use super::*;

pub const DEFAULT_PORT: u16 = 502;
pub const DEFAULT_UNIT_ID: u8 = 1;
pub const DEFAULT_RECONNECT_INTERVAL_MS: u32 = 60_000;

/// Shortest reconnect period; an interval of 0 ("immediately") maps here
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            ip_address: String::new(),
            port: DEFAULT_PORT,
            unit_id: DEFAULT_UNIT_ID,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
        }
    }
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            max_charging_power: 8192,
            charging_control: 8198,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}
