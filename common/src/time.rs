use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Epochs at or below this mean the clock was never set.
pub const SYNCED_EPOCH_THRESHOLD: i64 = 1_600_000_000;
pub const RESYNC_HOUR: u32 = 3;
pub const RESYNC_MIN_GAP_SECS: i64 = 3_600;

pub trait ClockProvider {
    fn now_local(&self) -> DateTime<FixedOffset>;

    fn epoch_secs(&self) -> i64 {
        self.now_local().timestamp()
    }
}

pub trait SettableClock: ClockProvider {
    fn resync(&self) -> bool;

    fn set_local(&self, local: DateTime<FixedOffset>);
}

pub fn is_synced_epoch(epoch_secs: i64) -> bool {
    epoch_secs > SYNCED_EPOCH_THRESHOLD
}

pub fn fallback_time(offset: FixedOffset) -> DateTime<FixedOffset> {
    offset
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&offset))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DailyResync {
    last_sync_epoch: Option<i64>,
}

impl DailyResync {
    pub fn new(last_sync_epoch: Option<i64>) -> Self {
        Self { last_sync_epoch }
    }

    pub fn due(&self, now: &DateTime<FixedOffset>) -> bool {
        if now.hour() != RESYNC_HOUR {
            return false;
        }
        match self.last_sync_epoch {
            Some(last) => now.timestamp() - last > RESYNC_MIN_GAP_SECS,
            None => true,
        }
    }

    pub fn mark_synced(&mut self, epoch_secs: i64) {
        self.last_sync_epoch = Some(epoch_secs);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Meridiem {
    #[serde(alias = "a", alias = "AM", alias = "am")]
    A,
    #[serde(alias = "p", alias = "PM", alias = "pm")]
    P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    #[serde(default, rename = "ampm")]
    pub meridiem: Option<Meridiem>,
}

impl ManualTime {
    pub fn hour_24(&self) -> Result<u32, ConfigError> {
        match self.meridiem {
            None if self.hour < 24 => Ok(self.hour),
            Some(_) if !(1..=12).contains(&self.hour) => Err(ConfigError::InvalidDateTime),
            Some(Meridiem::P) if self.hour < 12 => Ok(self.hour + 12),
            Some(Meridiem::A) if self.hour == 12 => Ok(0),
            Some(_) => Ok(self.hour),
            None => Err(ConfigError::InvalidDateTime),
        }
    }

    pub fn to_local(&self, offset: FixedOffset) -> Result<DateTime<FixedOffset>, ConfigError> {
        let naive = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hour_24().ok()?, self.minute, 0))
            .ok_or(ConfigError::InvalidDateTime)?;

        offset
            .from_local_datetime(&naive)
            .single()
            .ok_or(ConfigError::InvalidDateTime)
    }
}
