use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_INTENSITY: u8 = 15;
pub const MAX_SLOT_DURATION_SECS: u8 = 60;
pub const MAX_HOSTNAME_LEN: usize = 31;
pub const FEATURE_COMMAND_LEN: usize = 31;
pub const MAX_CALIBRATION_DELTA: f32 = 20.0;

pub const FEATURE_FLIP_DISPLAY: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "hostname must be 1-{max} characters without spaces, '/', '+' or '#'",
        max = MAX_HOSTNAME_LEN
    )]
    InvalidHostname,
    #[error("command must be 1-{max} characters of '0' or '1'", max = FEATURE_COMMAND_LEN)]
    InvalidCommand,
    #[error("timezone offset {0}s is out of range")]
    InvalidTimezoneOffset(i32),
    #[error("timezone name cannot be empty")]
    EmptyTimezoneName,
    #[error("invalid date or time")]
    InvalidDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(self) -> char {
        match self {
            Self::Celsius => 'C',
            Self::Fahrenheit => 'F',
        }
    }

    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub use_24h_format: bool,
    pub use_celsius: bool,
    pub date_duration: u8,
    pub temp_duration: u8,
    pub humidity_duration: u8,
    pub auto_brightness: bool,
    pub min_brightness: u8,
    pub max_brightness: u8,
    pub man_brightness: u8,
    pub temp_delta: f32,
    pub humidity_delta: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_24h_format: false,
            use_celsius: true,
            date_duration: 5,
            temp_duration: 5,
            humidity_duration: 5,
            auto_brightness: false,
            min_brightness: 0,
            max_brightness: MAX_INTENSITY,
            man_brightness: 8,
            temp_delta: 0.0,
            humidity_delta: 0.0,
        }
    }
}

impl DisplayConfig {
    /// Clamps every field into range but keeps the brightness bounds in
    /// the order they were given.
    pub fn clamp_ranges(&mut self) {
        self.date_duration = self.date_duration.min(MAX_SLOT_DURATION_SECS);
        self.temp_duration = self.temp_duration.min(MAX_SLOT_DURATION_SECS);
        self.humidity_duration = self.humidity_duration.min(MAX_SLOT_DURATION_SECS);

        self.min_brightness = self.min_brightness.min(MAX_INTENSITY);
        self.max_brightness = self.max_brightness.min(MAX_INTENSITY);
        self.man_brightness = self.man_brightness.min(MAX_INTENSITY);

        self.temp_delta = sanitize_delta(self.temp_delta);
        self.humidity_delta = sanitize_delta(self.humidity_delta);
    }

    pub fn sanitize(&mut self) {
        self.clamp_ranges();
        if self.min_brightness > self.max_brightness {
            std::mem::swap(&mut self.min_brightness, &mut self.max_brightness);
        }
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        if self.use_celsius {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        }
    }

    pub fn rotation_changed(&self, other: &Self) -> bool {
        self.date_duration != other.date_duration
            || self.temp_duration != other.temp_duration
            || self.humidity_duration != other.humidity_duration
    }
}

fn sanitize_delta(delta: f32) -> f32 {
    if delta.is_finite() {
        delta.clamp(-MAX_CALIBRATION_DELTA, MAX_CALIBRATION_DELTA)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub timezone_offset_secs: i32,
    pub timezone_name: String,
    pub manual_time_set: bool,
    pub last_manual_set: i64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone_offset_secs: 19_800,
            timezone_name: "IST".to_string(),
            manual_time_set: false,
            last_manual_set: 0,
        }
    }
}

impl TimeConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    pub fn set_timezone(&mut self, offset_secs: i32, name: &str) -> Result<(), ConfigError> {
        if FixedOffset::east_opt(offset_secs).is_none() {
            return Err(ConfigError::InvalidTimezoneOffset(offset_secs));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyTimezoneName);
        }
        self.timezone_offset_secs = offset_secs;
        self.timezone_name = name.chars().take(31).collect();
        Ok(())
    }

    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if FixedOffset::east_opt(self.timezone_offset_secs).is_none() {
            self.timezone_offset_secs = defaults.timezone_offset_secs;
        }
        if self.timezone_name.trim().is_empty() {
            self.timezone_name = defaults.timezone_name;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 1883,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl MqttConfig {
    pub fn is_empty(&self) -> bool {
        self.server.trim().is_empty() || self.port == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub hostname: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: "DeskClock".to_string(),
        }
    }
}

impl DeviceConfig {
    pub fn set_hostname(&mut self, hostname: &str) -> Result<(), ConfigError> {
        let hostname = hostname.trim();
        if !is_valid_hostname(hostname) {
            return Err(ConfigError::InvalidHostname);
        }
        self.hostname = hostname.to_string();
        Ok(())
    }

    pub fn sanitize(&mut self) {
        if !is_valid_hostname(&self.hostname) {
            self.hostname = Self::default().hostname;
        }
    }
}

fn is_valid_hostname(hostname: &str) -> bool {
    !hostname.is_empty()
        && hostname.chars().count() <= MAX_HOSTNAME_LEN
        && !hostname
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '+' | '#'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemCommandConfig {
    pub command: String,
}

impl Default for SystemCommandConfig {
    fn default() -> Self {
        Self {
            command: "0".repeat(FEATURE_COMMAND_LEN),
        }
    }
}

impl SystemCommandConfig {
    pub fn is_feature_enabled(&self, bit: u8) -> bool {
        self.command.as_bytes().get(usize::from(bit)) == Some(&b'1')
    }

    pub fn set_command(&mut self, command: &str) -> Result<(), ConfigError> {
        let command = command.trim();
        if command.is_empty()
            || command.len() > FEATURE_COMMAND_LEN
            || !command.bytes().all(|b| b == b'0' || b == b'1')
        {
            return Err(ConfigError::InvalidCommand);
        }
        let mut padded = command.to_string();
        padded.extend(std::iter::repeat('0').take(FEATURE_COMMAND_LEN - command.len()));
        self.command = padded;
        Ok(())
    }

    pub fn sanitize(&mut self) {
        let current = std::mem::take(&mut self.command);
        if self.set_command(&current).is_err() {
            *self = Self::default();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    pub update_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub display: DisplayConfig,
    pub time: TimeConfig,
    pub mqtt: MqttConfig,
    pub device: DeviceConfig,
    pub system: SystemCommandConfig,
    pub firmware: FirmwareConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.display.sanitize();
        self.time.sanitize();
        self.device.sanitize();
        self.system.sanitize();
    }
}
