use std::sync::{
    atomic::{AtomicI32, AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use deskclock_common::{
    display::TextEffect, time::is_synced_epoch, ClimateReading, ClimateSensor, ClockProvider,
    DisplaySink, Intensity, LightSensor, RenderRequest, SettableClock,
};
use tracing::{debug, info};

pub struct SimulatedLightSensor {
    tick: u64,
}

impl Default for SimulatedLightSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLightSensor {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl LightSensor for SimulatedLightSensor {
    fn sample(&mut self) -> u16 {
        self.tick = self.tick.wrapping_add(1);
        let phase = (self.tick % 600) as f32 / 600.0 * std::f32::consts::TAU;
        let level = 517.0 - 500.0 * phase.cos();
        let jitter = (self.tick % 7) as f32 * 3.0;
        (level + jitter) as u16
    }
}

pub struct SimulatedClimateSensor {
    tick: u64,
}

impl Default for SimulatedClimateSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedClimateSensor {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl ClimateSensor for SimulatedClimateSensor {
    fn read(&mut self) -> ClimateReading {
        self.tick = self.tick.wrapping_add(1);
        if self.tick % 50 == 0 {
            return ClimateReading {
                temperature_c: f32::NAN,
                humidity: f32::NAN,
            };
        }
        ClimateReading {
            temperature_c: 22.0 + (self.tick % 12) as f32 * 0.15,
            humidity: 41.0 + (self.tick % 9) as f32 * 0.5,
        }
    }
}

/// Logs frames instead of driving MAX7219 modules. Scrolling text takes
/// one animation poll per character so waits behave like the hardware.
pub struct ConsoleDisplay {
    name: &'static str,
    frames_left: usize,
    intensity: Intensity,
    flipped: bool,
}

impl ConsoleDisplay {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            frames_left: 0,
            intensity: Intensity::Level(0),
            flipped: false,
        }
    }
}

impl DisplaySink for ConsoleDisplay {
    fn clear(&mut self) {
        self.frames_left = 0;
    }

    fn render(&mut self, request: &RenderRequest) {
        self.frames_left = match request.in_effect {
            TextEffect::None => 1,
            TextEffect::ScrollLeft => request.text.chars().count().max(1),
        };
        debug!(
            zone = self.name,
            intensity = ?self.intensity,
            flipped = self.flipped,
            "render {:?}",
            request.text
        );
    }

    fn animate(&mut self) -> bool {
        self.frames_left = self.frames_left.saturating_sub(1);
        self.frames_left == 0
    }

    fn set_intensity(&mut self, intensity: Intensity) {
        self.intensity = intensity;
    }

    fn set_flipped(&mut self, flipped: bool) {
        if self.flipped != flipped {
            info!(zone = self.name, flipped, "display orientation changed");
        }
        self.flipped = flipped;
    }
}

#[derive(Clone)]
pub struct SystemClock {
    offset_secs: Arc<AtomicI32>,
    adjust_secs: Arc<AtomicI64>,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset_secs: Arc::new(AtomicI32::new(offset.local_minus_utc())),
            adjust_secs: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        let secs = self.offset_secs.load(Ordering::Relaxed);
        FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
    }

    pub fn set_offset(&self, offset: FixedOffset) {
        self.offset_secs
            .store(offset.local_minus_utc(), Ordering::Relaxed);
    }

    pub fn clear_adjustment(&self) {
        self.adjust_secs.store(0, Ordering::Relaxed);
    }
}

impl ClockProvider for SystemClock {
    fn now_local(&self) -> DateTime<FixedOffset> {
        let adjust = chrono::Duration::seconds(self.adjust_secs.load(Ordering::Relaxed));
        (Utc::now() + adjust).with_timezone(&self.offset())
    }
}

impl SettableClock for SystemClock {
    // A synced host clock wins over any manual adjustment.
    fn resync(&self) -> bool {
        let synced = host_synced();
        if synced {
            self.clear_adjustment();
        }
        synced
    }

    fn set_local(&self, local: DateTime<FixedOffset>) {
        let adjust = local.timestamp() - Utc::now().timestamp();
        self.adjust_secs.store(adjust, Ordering::Relaxed);
    }
}

fn host_synced() -> bool {
    is_synced_epoch(Utc::now().timestamp())
}
