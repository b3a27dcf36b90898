pub mod brightness;
pub mod config;
pub mod display;
pub mod format;
pub mod rotation;
pub mod scheduler;
pub mod sensor;
pub mod time;
pub mod topics;
pub mod types;

pub use brightness::{BrightnessSmoother, BrightnessUpdate, SampleWindow};
pub use config::{
    ConfigError, DeviceConfig, DisplayConfig, FirmwareConfig, MqttConfig, RuntimeConfig,
    SystemCommandConfig, TemperatureUnit, TimeConfig,
};
pub use display::{ClockZone, DisplaySink, DisplayZones, Intensity, RenderRequest, RotatingZone};
pub use rotation::{RotationCursor, RotationPlan, Rotator, SlotKind};
pub use scheduler::{DeskClock, Interval};
pub use sensor::{ClimateReading, ClimateSample, ClimateSensor, LightSensor, SensorCache};
pub use time::{ClockProvider, DailyResync, ManualTime, Meridiem, SettableClock};
pub use types::{ClockStatus, DiscoveryConfig};
