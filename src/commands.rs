//! Translates store commands into register writes

use crate::codec::PendingWrite;
use crate::config::RegistersConfig;
use crate::logging::{StructuredLogger, get_logger};
use crate::store::StateChange;
use crate::telemetry::{CHARGING_CONTROL, MAX_CHARGING_POWER};
use serde_json::Value;

/// Charging state accepted on the `chargingControl` channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChargingControl {
    Standby = 0,
    Paused = 1,
    Charging = 2,
}

impl ChargingControl {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Standby),
            1 => Some(Self::Paused),
            2 => Some(Self::Charging),
            _ => None,
        }
    }
}

pub struct CommandRouter {
    registers: RegistersConfig,
    logger: StructuredLogger,
}

impl CommandRouter {
    pub fn new(registers: RegistersConfig) -> Self {
        Self {
            registers,
            logger: get_logger("router"),
        }
    }

    /// Map a store change to a register write
    ///
    /// Returns `None` for acknowledged echoes, for keys other than the two
    /// command channels and for values that cannot be encoded.
    pub fn route(&self, change: &StateChange) -> Option<PendingWrite> {
        if change.ack {
            return None;
        }

        let key = command_key(&change.key)?;
        self.logger
            .info(&format!("State {} changed: {}", change.key, change.value));

        let Some(number) = as_number(&change.value) else {
            self.logger.warn(&format!(
                "Ignoring {}: value {} is not numeric",
                key, change.value
            ));
            return None;
        };

        let routed = if key == MAX_CHARGING_POWER {
            // Register holds tenths of a kW
            to_register_value(number * 10.0)
                .map(|raw| PendingWrite::new(self.registers.max_charging_power, raw))
        } else {
            to_register_value(number).map(|raw| {
                if let Some(state) = ChargingControl::from_raw(raw) {
                    self.logger
                        .debug(&format!("Charging control -> {:?}", state));
                }
                PendingWrite::new(self.registers.charging_control, raw)
            })
        };

        if routed.is_none() {
            self.logger.warn(&format!(
                "Ignoring {}: value {} does not fit the register",
                key, change.value
            ));
        }
        routed
    }
}

/// Canonical command channel for `key`, accepting an instance prefix such as
/// `huawei-charger.0.charger.maxChargingPower`
fn command_key(key: &str) -> Option<&'static str> {
    [MAX_CHARGING_POWER, CHARGING_CONTROL]
        .into_iter()
        .find(|id| key == *id || key.strip_suffix(*id).is_some_and(|p| p.ends_with('.')))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_register_value(value: f64) -> Option<u32> {
    let rounded = value.round();
    if rounded.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&rounded) {
        Some(rounded as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn router() -> CommandRouter {
        CommandRouter::new(RegistersConfig::default())
    }

    #[test]
    fn max_power_is_scaled_to_tenths() {
        let routed = router()
            .route(&StateChange::command(MAX_CHARGING_POWER, json!(15)))
            .unwrap();
        assert_eq!(routed, PendingWrite::new(8192, 150));
    }

    #[test]
    fn fractional_power_rounds() {
        let routed = router()
            .route(&StateChange::command(MAX_CHARGING_POWER, json!(7.36)))
            .unwrap();
        assert_eq!(routed.value, 74);
    }

    #[test]
    fn charging_control_is_passed_raw() {
        let routed = router()
            .route(&StateChange::command(CHARGING_CONTROL, json!(2)))
            .unwrap();
        assert_eq!(routed, PendingWrite::new(8198, 2));
    }

    #[test]
    fn echoes_are_ignored() {
        assert!(
            router()
                .route(&StateChange::acknowledged(CHARGING_CONTROL, json!(2)))
                .is_none()
        );
    }

    #[test]
    fn other_keys_are_ignored() {
        let r = router();
        assert!(r.route(&StateChange::command("charger.totalPower", json!(3))).is_none());
        assert!(r.route(&StateChange::command("info.connection", json!(true))).is_none());
        assert!(
            r.route(&StateChange::command("charger.xmaxChargingPower", json!(3)))
                .is_none()
        );
    }

    #[test]
    fn namespaced_keys_are_accepted() {
        let routed = router()
            .route(&StateChange::command(
                "huawei-charger.0.charger.chargingControl",
                json!(1),
            ))
            .unwrap();
        assert_eq!(routed, PendingWrite::new(8198, 1));
    }

    #[test]
    fn unencodable_values_are_dropped() {
        let r = router();
        assert!(r.route(&StateChange::command(MAX_CHARGING_POWER, json!(-1))).is_none());
        assert!(r.route(&StateChange::command(CHARGING_CONTROL, json!("abc"))).is_none());
        assert!(r.route(&StateChange::command(CHARGING_CONTROL, json!(null))).is_none());
    }

    #[test]
    fn string_values_are_parsed() {
        let routed = router()
            .route(&StateChange::command(MAX_CHARGING_POWER, json!("11,5")))
            .unwrap();
        assert_eq!(routed.value, 115);
    }

    #[test]
    fn custom_registers_are_used() {
        let r = CommandRouter::new(RegistersConfig {
            max_charging_power: 100,
            charging_control: 101,
        });
        let routed = r
            .route(&StateChange::command(CHARGING_CONTROL, json!(0)))
            .unwrap();
        assert_eq!(routed, PendingWrite::new(101, 0));
    }
}
