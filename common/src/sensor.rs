use serde::Serialize;

use crate::config::{DisplayConfig, TemperatureUnit};

pub trait LightSensor {
    fn sample(&mut self) -> u16;
}

pub trait ClimateSensor {
    fn read(&mut self) -> ClimateReading;
}

/// Raw sensor output. Failed reads come back as NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity: f32,
}

impl ClimateReading {
    pub fn is_valid(&self) -> bool {
        self.temperature_c.is_finite() && self.humidity.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateSample {
    pub temperature: f32,
    pub humidity: f32,
    pub unit: TemperatureUnit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SensorCache {
    temperature_c: Option<f32>,
    humidity: Option<f32>,
}

impl SensorCache {
    pub fn ingest(
        &mut self,
        reading: ClimateReading,
        config: &DisplayConfig,
    ) -> Option<ClimateSample> {
        if !reading.is_valid() {
            return None;
        }
        self.temperature_c = Some(reading.temperature_c);
        self.humidity = Some(reading.humidity);

        Some(ClimateSample {
            temperature: self.temperature(config)?,
            humidity: self.humidity(config)?,
            unit: config.temperature_unit(),
        })
    }

    pub fn temperature(&self, config: &DisplayConfig) -> Option<f32> {
        self.temperature_c
            .map(|celsius| config.temperature_unit().from_celsius(celsius) + config.temp_delta)
    }

    pub fn humidity(&self, config: &DisplayConfig) -> Option<f32> {
        self.humidity
            .map(|raw| (raw + config.humidity_delta).clamp(0.0, 100.0))
    }

    pub fn is_valid(&self) -> bool {
        self.temperature_c.is_some() && self.humidity.is_some()
    }
}
