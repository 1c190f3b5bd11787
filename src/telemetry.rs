//! Telemetry records and the channels they are published on

use crate::codec::round2;
use crate::logging::{StructuredLogger, get_logger};
use crate::store::StateStore;
use serde::Serialize;
use serde_json::json;

/// Connectivity flag
pub const CONNECTION: &str = "info.connection";
pub const PHASE_L1_VOLTAGE: &str = "charger.phaseL1.voltage";
pub const PHASE_L2_VOLTAGE: &str = "charger.phaseL2.voltage";
pub const PHASE_L3_VOLTAGE: &str = "charger.phaseL3.voltage";
pub const PHASE_L1_CURRENT: &str = "charger.phaseL1.current";
pub const PHASE_L2_CURRENT: &str = "charger.phaseL2.current";
pub const PHASE_L3_CURRENT: &str = "charger.phaseL3.current";
pub const TOTAL_POWER: &str = "charger.totalPower";
pub const COMBINED_VOLTAGE: &str = "charger.combined.voltage";
pub const COMBINED_CURRENT: &str = "charger.combined.current";
/// Writable: charging power limit in kW
pub const MAX_CHARGING_POWER: &str = "charger.maxChargingPower";
/// Writable: 0 = standby, 1 = paused, 2 = charging
pub const CHARGING_CONTROL: &str = "charger.chargingControl";

/// Decoded measurements of one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// L1..L3 voltage in V
    pub phase_voltage: [f64; 3],
    /// L1..L3 current in A
    pub phase_current: [f64; 3],
    /// Total output power in kW
    pub total_power: f64,
    /// Average of the non-zero phase voltages, 0 when all are zero
    pub combined_voltage: f64,
    /// Sum of the phase currents
    pub combined_current: f64,
}

impl TelemetryRecord {
    /// Build a record, computing the derived aggregates
    pub fn new(phase_voltage: [f64; 3], phase_current: [f64; 3], total_power: f64) -> Self {
        let live: Vec<f64> = phase_voltage.iter().copied().filter(|v| *v > 0.0).collect();
        let combined_voltage = if live.is_empty() {
            0.0
        } else {
            round2(live.iter().sum::<f64>() / live.len() as f64)
        };
        let combined_current = round2(phase_current.iter().sum());

        Self {
            phase_voltage,
            phase_current,
            total_power,
            combined_voltage,
            combined_current,
        }
    }

    /// Channel id and value for every published field
    pub fn channel_values(&self) -> [(&'static str, f64); 9] {
        [
            (PHASE_L1_VOLTAGE, self.phase_voltage[0]),
            (PHASE_L2_VOLTAGE, self.phase_voltage[1]),
            (PHASE_L3_VOLTAGE, self.phase_voltage[2]),
            (PHASE_L1_CURRENT, self.phase_current[0]),
            (PHASE_L2_CURRENT, self.phase_current[1]),
            (PHASE_L3_CURRENT, self.phase_current[2]),
            (TOTAL_POWER, self.total_power),
            (COMBINED_VOLTAGE, self.combined_voltage),
            (COMBINED_CURRENT, self.combined_current),
        ]
    }
}

/// Value type of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Number,
}

/// Declaration of a published channel
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChannelDef {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ValueKind,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(skip_serializing_if = "no_states")]
    pub states: &'static [(u8, &'static str)],
}

fn no_states(states: &&'static [(u8, &'static str)]) -> bool {
    states.is_empty()
}

impl ChannelDef {
    const fn reading(
        id: &'static str,
        name: &'static str,
        role: &'static str,
        unit: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            kind: ValueKind::Number,
            role,
            unit: Some(unit),
            writable: false,
            min: None,
            max: None,
            default: None,
            states: &[],
        }
    }
}

/// Every channel the bridge publishes or accepts commands on
pub static CHANNELS: [ChannelDef; 12] = [
    ChannelDef {
        id: CONNECTION,
        name: "Device or service connected",
        kind: ValueKind::Boolean,
        role: "indicator.connected",
        unit: None,
        writable: false,
        min: None,
        max: None,
        default: None,
        states: &[],
    },
    ChannelDef::reading(PHASE_L1_VOLTAGE, "Phase L1 Output Voltage", "value.voltage", "V"),
    ChannelDef::reading(PHASE_L2_VOLTAGE, "Phase L2 Output Voltage", "value.voltage", "V"),
    ChannelDef::reading(PHASE_L3_VOLTAGE, "Phase L3 Output Voltage", "value.voltage", "V"),
    ChannelDef::reading(PHASE_L1_CURRENT, "Phase L1 Output Current", "value.current", "A"),
    ChannelDef::reading(PHASE_L2_CURRENT, "Phase L2 Output Current", "value.current", "A"),
    ChannelDef::reading(PHASE_L3_CURRENT, "Phase L3 Output Current", "value.current", "A"),
    ChannelDef::reading(TOTAL_POWER, "Total Output Power", "value.power", "kW"),
    ChannelDef::reading(
        COMBINED_VOLTAGE,
        "Combined Voltage (average)",
        "value.voltage",
        "V",
    ),
    ChannelDef::reading(
        COMBINED_CURRENT,
        "Combined Current (L1 + L2 + L3)",
        "value.current",
        "A",
    ),
    ChannelDef {
        id: MAX_CHARGING_POWER,
        name: "Max Charging Power",
        kind: ValueKind::Number,
        role: "level",
        unit: Some("kW"),
        writable: true,
        min: Some(0.0),
        max: Some(22.0),
        default: Some(22.0),
        states: &[],
    },
    ChannelDef {
        id: CHARGING_CONTROL,
        name: "Charging Control",
        kind: ValueKind::Number,
        role: "state",
        unit: None,
        writable: true,
        min: None,
        max: None,
        default: Some(0.0),
        states: &[(0, "Standby"), (1, "Paused"), (2, "Charging")],
    },
];

/// Look up a channel by id
pub fn channel(id: &str) -> Option<&'static ChannelDef> {
    CHANNELS.iter().find(|c| c.id == id)
}

/// Pushes decoded records and the connectivity flag into the store
pub struct TelemetryPublisher<S: StateStore> {
    store: S,
    logger: StructuredLogger,
}

impl<S: StateStore> TelemetryPublisher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            logger: get_logger("telemetry"),
        }
    }

    /// Declare every channel in the store
    pub fn define_channels(&self) {
        for spec in &CHANNELS {
            self.store.define(spec);
        }
    }

    /// Publish all nine measurement channels of `record`
    pub fn publish(&self, record: &TelemetryRecord) {
        for (key, value) in record.channel_values() {
            self.store.publish(key, json!(value));
        }
        self.logger.debug(&format!(
            "Published telemetry: {:.2} V, {:.2} A, {:.2} kW",
            record.combined_voltage, record.combined_current, record.total_power
        ));
    }

    pub fn publish_connection(&self, connected: bool) {
        self.store.publish(CONNECTION, json!(connected));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn combined_voltage_ignores_dead_phases() {
        let rec = TelemetryRecord::new([230.0, 0.0, 228.0], [0.0; 3], 0.0);
        assert_eq!(rec.combined_voltage, 229.0);

        let rec = TelemetryRecord::new([0.0; 3], [1.5, 2.5, 0.0], 0.0);
        assert_eq!(rec.combined_voltage, 0.0);
        assert_eq!(rec.combined_current, 4.0);
    }

    #[test]
    fn combined_voltage_is_rounded() {
        let rec = TelemetryRecord::new([230.01, 230.02, 230.02], [0.0; 3], 0.0);
        assert_eq!(rec.combined_voltage, 230.02);
    }

    #[test]
    fn publish_writes_all_nine_channels() {
        let store = MemoryStore::new();
        let publisher = TelemetryPublisher::new(store.clone());
        publisher.publish(&TelemetryRecord::default());

        assert_eq!(store.publish_count(), 9);
        for (key, _) in TelemetryRecord::default().channel_values() {
            assert_eq!(store.get(key), Some(json!(0.0)), "{key}");
        }
    }

    #[test]
    fn catalogue_marks_only_commands_writable() {
        let writable: Vec<_> = CHANNELS.iter().filter(|c| c.writable).map(|c| c.id).collect();
        assert_eq!(writable, vec![MAX_CHARGING_POWER, CHARGING_CONTROL]);
        assert_eq!(channel(MAX_CHARGING_POWER).and_then(|c| c.default), Some(22.0));
        assert!(channel("charger.unknown").is_none());
    }

    #[test]
    fn define_channels_declares_catalogue() {
        let store = MemoryStore::new();
        TelemetryPublisher::new(store.clone()).define_channels();
        assert_eq!(store.defined().len(), CHANNELS.len());
    }
}
