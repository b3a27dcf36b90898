use chrono::{DateTime, FixedOffset, Timelike};

use crate::config::TemperatureUnit;

pub fn format_time(now: &DateTime<FixedOffset>, use_24h_format: bool) -> String {
    if use_24h_format {
        return now.format("%H:%M").to_string();
    }

    let clock = now.format("%I:%M").to_string();
    let clock = match clock.strip_prefix('0') {
        Some(rest) => format!(" {rest}"),
        None => clock,
    };
    let meridiem = if now.hour() < 12 { 'A' } else { 'P' };
    format!("{clock} {meridiem}")
}

pub fn format_date(now: &DateTime<FixedOffset>) -> String {
    let text = now.format("%b %d").to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

pub fn format_temperature(value: f32, unit: TemperatureUnit) -> Option<String> {
    value
        .is_finite()
        .then(|| format!("{value:.1}{}", unit.symbol()))
}

pub fn format_humidity(value: f32) -> Option<String> {
    value.is_finite().then(|| format!("{value:.1}%"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19_800)
            .unwrap()
            .with_ymd_and_hms(2024, 10, 5, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn twenty_four_hour_clock_is_zero_padded() {
        assert_eq!(format_time(&at(9, 5), true), "09:05");
        assert_eq!(format_time(&at(21, 5), true), "21:05");
        assert_eq!(format_time(&at(0, 0), true), "00:00");
    }

    #[test]
    fn twelve_hour_clock_blanks_leading_zero() {
        assert_eq!(format_time(&at(21, 5), false), " 9:05 P");
        assert_eq!(format_time(&at(9, 5), false), " 9:05 A");
        assert_eq!(format_time(&at(11, 59), false), "11:59 A");
    }

    #[test]
    fn midnight_and_noon_in_twelve_hour_clock() {
        assert_eq!(format_time(&at(0, 30), false), "12:30 A");
        assert_eq!(format_time(&at(12, 0), false), "12:00 P");
    }

    #[test]
    fn date_uses_short_month_and_padded_day() {
        assert_eq!(format_date(&at(8, 0)), "Oct 05");
    }

    #[test]
    fn temperature_carries_unit_symbol() {
        assert_eq!(
            format_temperature(23.4, TemperatureUnit::Celsius).as_deref(),
            Some("23.4C")
        );
        assert_eq!(
            format_temperature(74.12, TemperatureUnit::Fahrenheit).as_deref(),
            Some("74.1F")
        );
        assert_eq!(format_temperature(f32::NAN, TemperatureUnit::Celsius), None);
    }

    #[test]
    fn humidity_has_percent_suffix() {
        assert_eq!(format_humidity(41.5).as_deref(), Some("41.5%"));
        assert_eq!(format_humidity(f32::INFINITY), None);
    }
}
