use serde::Serialize;

use crate::{config::TemperatureUnit, display::Intensity, rotation::SlotKind, topics};

#[derive(Debug, Clone, Serialize)]
pub struct BrightnessStatus {
    #[serde(rename = "autoBrightness")]
    pub auto_brightness: bool,
    pub applied: Intensity,
    pub target: Intensity,
    #[serde(rename = "lightAverage")]
    pub light_average: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationStatus {
    pub slot: Option<SlotKind>,
    pub index: usize,
    #[serde(rename = "planLength")]
    pub plan_length: usize,
    #[serde(rename = "lastChangeMs")]
    pub last_change_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClockStatus {
    pub time: String,
    pub date: String,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub unit: TemperatureUnit,
    #[serde(rename = "sensorValid")]
    pub sensor_valid: bool,
    pub brightness: BrightnessStatus,
    pub rotation: RotationStatus,
    #[serde(rename = "timeSynced")]
    pub time_synced: bool,
    pub epoch: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryConfig {
    pub name: String,
    pub device_class: &'static str,
    pub state_topic: String,
    pub unit_of_measurement: &'static str,
    pub unique_id: String,
}

impl DiscoveryConfig {
    pub fn temperature(hostname: &str, unit: TemperatureUnit) -> Self {
        Self {
            name: format!("{hostname} Temperature"),
            device_class: "temperature",
            state_topic: topics::temperature_state(hostname),
            unit_of_measurement: match unit {
                TemperatureUnit::Celsius => "°C",
                TemperatureUnit::Fahrenheit => "°F",
            },
            unique_id: format!("{hostname}_temp"),
        }
    }

    pub fn humidity(hostname: &str) -> Self {
        Self {
            name: format!("{hostname} Humidity"),
            device_class: "humidity",
            state_topic: topics::humidity_state(hostname),
            unit_of_measurement: "%",
            unique_id: format!("{hostname}_humidity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn temperature_discovery_document() {
        let doc = serde_json::to_value(DiscoveryConfig::temperature(
            "DeskClock",
            TemperatureUnit::Celsius,
        ))
        .unwrap();

        assert_eq!(
            doc,
            json!({
                "name": "DeskClock Temperature",
                "device_class": "temperature",
                "state_topic": "homeassistant/sensor/DeskClock/temperature/state",
                "unit_of_measurement": "°C",
                "unique_id": "DeskClock_temp",
            })
        );
    }

    #[test]
    fn humidity_discovery_uses_percent() {
        let doc = DiscoveryConfig::humidity("office");
        assert_eq!(doc.unit_of_measurement, "%");
        assert_eq!(doc.unique_id, "office_humidity");
    }

    #[test]
    fn intensity_serializes_tagged() {
        let status = BrightnessStatus {
            auto_brightness: true,
            applied: Intensity::Level(4),
            target: Intensity::Off,
            light_average: Some(512),
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({
                "autoBrightness": true,
                "applied": {"kind": "level", "level": 4},
                "target": {"kind": "off"},
                "lightAverage": 512,
            })
        );
    }
}
