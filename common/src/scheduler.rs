use crate::{
    brightness::BrightnessSmoother,
    config::DisplayConfig,
    display::{ClockZone, DisplaySink, DisplayZones, Intensity, RotatingZone},
    format::{format_date, format_humidity, format_temperature, format_time},
    rotation::{Rotator, SlotKind},
    sensor::{ClimateSample, ClimateSensor, LightSensor, SensorCache},
    time::{is_synced_epoch, ClockProvider},
    types::{BrightnessStatus, ClockStatus, RotationStatus},
};

pub const BRIGHTNESS_CHECK_INTERVAL_MS: u64 = 1_000;
pub const CLOCK_FACE_INTERVAL_MS: u64 = 1_000;
pub const CLIMATE_READ_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl Interval {
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    pub fn ready(&mut self, now_ms: u64) -> bool {
        let due = match self.last_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.period_ms,
            None => true,
        };
        if due {
            self.last_ms = Some(now_ms);
        }
        due
    }
}

#[derive(Debug, Clone)]
pub struct DeskClock {
    config: DisplayConfig,
    smoother: BrightnessSmoother,
    rotator: Rotator,
    sensors: SensorCache,
    light_check: Interval,
    climate_read: Interval,
    clock_face: Interval,
}

impl DeskClock {
    pub fn new(mut config: DisplayConfig) -> Self {
        config.clamp_ranges();
        Self {
            rotator: Rotator::new(&config),
            config,
            smoother: BrightnessSmoother::new(),
            sensors: SensorCache::default(),
            light_check: Interval::new(BRIGHTNESS_CHECK_INTERVAL_MS),
            climate_read: Interval::new(CLIMATE_READ_INTERVAL_MS),
            clock_face: Interval::new(CLOCK_FACE_INTERVAL_MS),
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn set_config(&mut self, mut config: DisplayConfig) {
        config.clamp_ranges();
        if self.config.rotation_changed(&config) {
            self.rotator.rebuild(&config);
        }
        self.config = config;
    }

    pub fn sensors(&self) -> &SensorCache {
        &self.sensors
    }

    pub fn check_brightness<L, C, R>(
        &mut self,
        now_ms: u64,
        light: &mut L,
        zones: &mut DisplayZones<C, R>,
    ) -> Option<Intensity>
    where
        L: LightSensor,
        C: DisplaySink,
        R: DisplaySink,
    {
        let sample = (self.config.auto_brightness && self.light_check.ready(now_ms))
            .then(|| light.sample());

        let update = self.smoother.tick(now_ms, sample, &self.config);
        if !update.changed {
            return None;
        }
        zones.set_intensity(update.applied);
        Some(update.applied)
    }

    pub fn check_climate<S: ClimateSensor>(
        &mut self,
        now_ms: u64,
        sensor: &mut S,
    ) -> Option<ClimateSample> {
        if !self.climate_read.ready(now_ms) {
            return None;
        }
        self.sensors.ingest(sensor.read(), &self.config)
    }

    pub fn check_clock_face<K, S>(
        &mut self,
        now_ms: u64,
        clock: &K,
        zone: &mut ClockZone<S>,
    ) -> Option<String>
    where
        K: ClockProvider,
        S: DisplaySink,
    {
        if !self.clock_face.ready(now_ms) {
            return None;
        }
        let text = format_time(&clock.now_local(), self.config.use_24h_format);
        zone.show_time(&text);
        Some(text)
    }

    pub fn check_rotation<K, S>(
        &mut self,
        now_ms: u64,
        clock: &K,
        zone: &mut RotatingZone<S>,
    ) -> Option<SlotKind>
    where
        K: ClockProvider,
        S: DisplaySink,
    {
        let kind = self.rotator.poll(now_ms, &self.config)?;
        // No reading yet: keep whatever the zone shows.
        let text = self.slot_text(kind, clock)?;
        zone.show(&text);
        Some(kind)
    }

    fn slot_text<K: ClockProvider>(&self, kind: SlotKind, clock: &K) -> Option<String> {
        match kind {
            SlotKind::Date => Some(format_date(&clock.now_local())),
            SlotKind::Temperature => format_temperature(
                self.sensors.temperature(&self.config)?,
                self.config.temperature_unit(),
            ),
            SlotKind::Humidity => format_humidity(self.sensors.humidity(&self.config)?),
        }
    }

    pub fn status<K: ClockProvider>(&self, clock: &K) -> ClockStatus {
        let now = clock.now_local();
        let cursor = self.rotator.cursor();

        ClockStatus {
            time: format_time(&now, self.config.use_24h_format),
            date: format_date(&now),
            temperature: self.sensors.temperature(&self.config),
            humidity: self.sensors.humidity(&self.config),
            unit: self.config.temperature_unit(),
            sensor_valid: self.sensors.is_valid(),
            brightness: BrightnessStatus {
                auto_brightness: self.config.auto_brightness,
                applied: self.smoother.applied(),
                target: self.smoother.target(),
                light_average: self.smoother.average(),
            },
            rotation: RotationStatus {
                slot: self.rotator.current().map(|slot| slot.kind),
                index: cursor.index,
                plan_length: self.rotator.plan().len(),
                last_change_ms: cursor.last_change_ms,
            },
            time_synced: is_synced_epoch(clock.epoch_secs()),
            epoch: clock.epoch_secs(),
        }
    }
}
