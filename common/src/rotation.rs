use serde::{Deserialize, Serialize};

use crate::config::DisplayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    Date,
    Temperature,
    Humidity,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Temperature => "TEMPERATURE",
            Self::Humidity => "HUMIDITY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub kind: SlotKind,
    pub duration_secs: u8,
}

impl Slot {
    fn duration_ms(self) -> u64 {
        u64::from(self.duration_secs) * 1_000
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPlan {
    slots: Vec<Slot>,
}

impl RotationPlan {
    pub fn from_config(config: &DisplayConfig) -> Self {
        let slots = [
            (SlotKind::Date, config.date_duration),
            (SlotKind::Temperature, config.temp_duration),
            (SlotKind::Humidity, config.humidity_duration),
        ]
        .into_iter()
        .filter(|&(_, duration_secs)| duration_secs > 0)
        .map(|(kind, duration_secs)| Slot {
            kind,
            duration_secs,
        })
        .collect();

        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationCursor {
    pub index: usize,
    pub last_change_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Rotator {
    plan: RotationPlan,
    cursor: RotationCursor,
}

impl Rotator {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            plan: RotationPlan::from_config(config),
            cursor: RotationCursor::default(),
        }
    }

    pub fn plan(&self) -> &RotationPlan {
        &self.plan
    }

    pub fn cursor(&self) -> RotationCursor {
        self.cursor
    }

    pub fn current(&self) -> Option<Slot> {
        self.plan.slots.get(self.cursor.index).copied()
    }

    pub fn rebuild(&mut self, config: &DisplayConfig) {
        self.plan = RotationPlan::from_config(config);
        self.cursor.index = match self.plan.len() {
            0 => 0,
            len => self.cursor.index % len,
        };
    }

    pub fn poll(&mut self, now_ms: u64, config: &DisplayConfig) -> Option<SlotKind> {
        if self.plan.is_empty() {
            self.rebuild(config);
        }
        let current = self.current()?;

        if now_ms.saturating_sub(self.cursor.last_change_ms) < current.duration_ms() {
            return None;
        }

        // Durations may have been edited since the last boundary.
        self.rebuild(config);
        self.advance(now_ms)
    }

    fn advance(&mut self, now_ms: u64) -> Option<SlotKind> {
        let len = self.plan.len();
        if len == 0 {
            return None;
        }

        self.cursor.index = (self.cursor.index + 1) % len;
        self.cursor.last_change_ms = now_ms;

        let next = self.plan.slots[self.cursor.index];
        if next.duration_secs == 0 {
            // Never render a disabled slot; the next boundary picks up from the one after it.
            self.cursor.index = (self.cursor.index + 1) % len;
            return None;
        }

        Some(next.kind)
    }
}
