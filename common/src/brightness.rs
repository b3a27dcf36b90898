use crate::{
    config::{DisplayConfig, MAX_INTENSITY},
    display::Intensity,
};

pub const WINDOW_LEN: usize = 10;
pub const MIN_ANALOG_VALUE: i32 = 10;
pub const MAX_ANALOG_VALUE: i32 = 1024;
pub const CONVERGENCE_INTERVAL_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: [u16; WINDOW_LEN],
    cursor: usize,
    seeded: bool,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            samples: [0; WINDOW_LEN],
            cursor: 0,
            seeded: false,
        }
    }

    pub fn push(&mut self, raw: u16) {
        if !self.seeded {
            self.samples = [raw; WINDOW_LEN];
            self.cursor = 0;
            self.seeded = true;
        }
        self.samples[self.cursor] = raw;
        self.cursor = (self.cursor + 1) % WINDOW_LEN;
    }

    pub fn average(&self) -> Option<u16> {
        if !self.seeded {
            return None;
        }
        let sum: u32 = self.samples.iter().map(|&s| u32::from(s)).sum();
        Some((sum / WINDOW_LEN as u32) as u16)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Maps an averaged reading onto `[min_brightness - 1, max_brightness]`,
/// inverted so that the darkest room gets `max_brightness`. A result of `-1`
/// switches the display off.
pub fn target_step(average: i32, min_brightness: u8, max_brightness: u8) -> i8 {
    let high = i32::from(max_brightness.min(MAX_INTENSITY));
    let low = i32::from(min_brightness.min(MAX_INTENSITY)) - 1;
    let reading = average.clamp(MIN_ANALOG_VALUE, MAX_ANALOG_VALUE);

    let span = MAX_ANALOG_VALUE - MIN_ANALOG_VALUE;
    let mapped = high + ((reading - MIN_ANALOG_VALUE) * (low - high)).div_euclid(span);

    // min > max is not rejected upstream, so order the bounds before clamping.
    let (floor, ceiling) = if low <= high { (low, high) } else { (high, low) };
    mapped.clamp(floor, ceiling) as i8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessUpdate {
    pub applied: Intensity,
    pub target: Intensity,
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct BrightnessSmoother {
    window: SampleWindow,
    applied: i8,
    target: i8,
    last_step_ms: Option<u64>,
    last_pushed: Intensity,
}

impl Default for BrightnessSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl BrightnessSmoother {
    pub fn new() -> Self {
        Self {
            window: SampleWindow::new(),
            applied: 0,
            target: 0,
            last_step_ms: None,
            last_pushed: Intensity::Level(0),
        }
    }

    pub fn applied(&self) -> Intensity {
        Intensity::from_step(self.applied)
    }

    pub fn target(&self) -> Intensity {
        Intensity::from_step(self.target)
    }

    pub fn average(&self) -> Option<u16> {
        self.window.average()
    }

    pub fn tick(
        &mut self,
        now_ms: u64,
        sample: Option<u16>,
        config: &DisplayConfig,
    ) -> BrightnessUpdate {
        if config.auto_brightness {
            if let Some(raw) = sample {
                self.window.push(raw);
            }
            if let Some(average) = self.window.average() {
                self.target = target_step(
                    i32::from(average),
                    config.min_brightness,
                    config.max_brightness,
                );
                self.converge(now_ms);
            }
        } else {
            // Manual values apply at once; auto mode starts a fresh window on return.
            self.window.reset();
            let manual = config.man_brightness.min(MAX_INTENSITY) as i8;
            self.target = manual;
            self.applied = manual;
        }

        let applied = self.applied();
        let changed = applied != self.last_pushed;
        if changed {
            self.last_pushed = applied;
        }

        BrightnessUpdate {
            applied,
            target: self.target(),
            changed,
        }
    }

    fn converge(&mut self, now_ms: u64) {
        if let Some(last) = self.last_step_ms {
            if now_ms.saturating_sub(last) < CONVERGENCE_INTERVAL_MS {
                return;
            }
        }

        self.applied += (self.target - self.applied).signum();
        self.last_step_ms = Some(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn auto_config(min_brightness: u8, max_brightness: u8) -> DisplayConfig {
        DisplayConfig {
            auto_brightness: true,
            min_brightness,
            max_brightness,
            ..DisplayConfig::default()
        }
    }

    #[test]
    fn first_sample_seeds_the_whole_window() {
        let mut window = SampleWindow::new();
        assert_eq!(window.average(), None);

        window.push(800);
        assert_eq!(window.average(), Some(800));

        window.push(0);
        assert_eq!(window.average(), Some(720));
    }

    #[test]
    fn mapping_is_inverted_and_rounds_down() {
        assert_eq!(target_step(10, 2, 15), 15);
        assert_eq!(target_step(1024, 2, 15), 1);
        // 15 - 14 * 490 / 1014 = 8.23
        assert_eq!(target_step(500, 2, 15), 8);
    }

    #[test]
    fn bright_room_can_switch_display_off() {
        assert_eq!(target_step(1024, 0, 15), -1);
        assert_eq!(Intensity::from_step(target_step(1024, 0, 15)), Intensity::Off);
    }

    #[test]
    fn readings_outside_sensor_range_are_clamped() {
        assert_eq!(target_step(0, 2, 15), 15);
        assert_eq!(target_step(5_000, 2, 15), 1);
    }

    #[test]
    fn swapped_bounds_do_not_panic() {
        for average in [0, 10, 300, 700, 1024, 4096] {
            let step = target_step(average, 12, 3);
            assert!((3..=11).contains(&step), "step {step} at {average}");
        }
    }

    #[test]
    fn converges_on_constant_light_within_bound() {
        let config = auto_config(2, 15);
        let mut smoother = BrightnessSmoother::new();

        let mut now = 0;
        while now <= 8 * CONVERGENCE_INTERVAL_MS {
            smoother.tick(now, Some(500), &config);
            now += 100;
        }

        assert_eq!(smoother.target(), Intensity::Level(8));
        assert_eq!(smoother.applied(), Intensity::Level(8));
    }

    #[test]
    fn rate_gate_blocks_second_step_within_interval() {
        let config = auto_config(2, 15);
        let mut smoother = BrightnessSmoother::new();

        let first = smoother.tick(1_000, Some(10), &config);
        assert_eq!(first.applied, Intensity::Level(1));
        assert!(first.changed);

        let second = smoother.tick(1_299, Some(10), &config);
        assert_eq!(second.applied, Intensity::Level(1));
        assert!(!second.changed);

        let third = smoother.tick(1_300, None, &config);
        assert_eq!(third.applied, Intensity::Level(2));
        assert!(third.changed);
    }

    #[test]
    fn manual_mode_applies_immediately() {
        let config = DisplayConfig {
            auto_brightness: false,
            man_brightness: 12,
            ..DisplayConfig::default()
        };
        let mut smoother = BrightnessSmoother::new();

        let update = smoother.tick(0, Some(900), &config);
        assert_eq!(update.applied, Intensity::Level(12));
        assert!(update.changed);

        let again = smoother.tick(10, None, &config);
        assert!(!again.changed);
    }

    #[test]
    fn returning_to_auto_reseeds_from_new_light() {
        let auto = auto_config(0, 15);
        let manual = DisplayConfig {
            man_brightness: 5,
            ..DisplayConfig::default()
        };
        let mut smoother = BrightnessSmoother::new();

        for i in 0..10 {
            smoother.tick(i * 1_000, Some(1024), &auto);
        }
        smoother.tick(20_000, None, &manual);
        assert_eq!(smoother.average(), None);

        smoother.tick(21_000, Some(10), &auto);
        assert_eq!(smoother.average(), Some(10));
        assert_eq!(smoother.target(), Intensity::Level(15));
        // Slewing resumes from the manual value.
        assert_eq!(smoother.applied(), Intensity::Level(6));
    }

    #[test]
    fn unseeded_auto_mode_holds_current_intensity() {
        let mut smoother = BrightnessSmoother::new();
        let update = smoother.tick(0, None, &auto_config(0, 15));

        assert_eq!(update.applied, Intensity::Level(0));
        assert!(!update.changed);
    }

    proptest! {
        #[test]
        fn average_only_reflects_last_window(
            samples in proptest::collection::vec(0u16..=1024, WINDOW_LEN..60),
        ) {
            let mut window = SampleWindow::new();
            for &s in &samples {
                window.push(s);
            }
            let tail = &samples[samples.len() - WINDOW_LEN..];
            let expected = tail.iter().map(|&s| u32::from(s)).sum::<u32>() / WINDOW_LEN as u32;
            prop_assert_eq!(window.average(), Some(expected as u16));
        }

        #[test]
        fn auto_mode_moves_at_most_one_step_per_tick(
            samples in proptest::collection::vec((0u16..=1100, 0u64..700), 1..120),
            min_brightness in 0u8..=15,
            max_brightness in 0u8..=15,
        ) {
            let config = auto_config(min_brightness, max_brightness);
            let mut smoother = BrightnessSmoother::new();
            let mut now = 0;
            let mut last_change: Option<u64> = None;

            for (raw, gap) in samples {
                now += gap;
                let before = smoother.applied().as_step();
                let after = smoother.tick(now, Some(raw), &config).applied.as_step();
                prop_assert!((after - before).abs() <= 1);
                if after != before {
                    if let Some(previous) = last_change {
                        prop_assert!(now - previous >= CONVERGENCE_INTERVAL_MS);
                    }
                    last_change = Some(now);
                }
            }
        }
    }
}
