//! Human readable durations.
//!
//! Input accepts compound forms like `1h30m`, `1h 30m` or `90s`. Stored values
//! use the canonical humantime rendering (`1h 30m`, `57s`, `0s`) so they always
//! parse back to the same number of seconds. The countdown display uses
//! [`format_clock`].

use crate::error::AppError;
use std::time::Duration;

/// Selection offered by the new-task workflow.
pub const DEFAULT_DURATIONS: [&str; 6] = ["10s", "1m", "15m", "30m", "1h", "3h"];

pub fn parse_duration(text: &str) -> Result<Duration, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("duration is required"));
    }

    let parsed = humantime::parse_duration(trimmed)
        .map_err(|err| AppError::invalid_input(format!("invalid duration '{trimmed}': {err}")))?;

    if parsed.subsec_nanos() != 0 {
        return Err(AppError::invalid_input(format!(
            "invalid duration '{trimmed}': sub-second precision is not supported"
        )));
    }

    Ok(parsed)
}

/// Renders `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn format_stored(duration: Duration) -> String {
    let whole = Duration::from_secs(duration.as_secs());
    humantime::format_duration(whole).to_string()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_DURATIONS, format_clock, format_stored, parse_duration};
    use std::time::Duration;

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(" 90s ").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2m5s").unwrap(), Duration::from_secs(125));
    }

    #[test]
    fn parses_every_default_duration() {
        let seconds: Vec<u64> = DEFAULT_DURATIONS
            .iter()
            .map(|text| parse_duration(text).unwrap().as_secs())
            .collect();
        assert_eq!(seconds, vec![10, 60, 900, 1800, 3600, 10800]);
    }

    #[test]
    fn rejects_empty_and_malformed_input() {
        for input in ["", "   ", "abc", "10", "h", "1x", "-5s"] {
            let err = parse_duration(input).unwrap_err();
            assert_eq!(err.code(), "invalid_input", "input {input:?}");
        }
    }

    #[test]
    fn rejects_sub_second_precision() {
        let err = parse_duration("1s 500ms").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn format_clock_is_zero_padded() {
        assert_eq!(format_clock(Duration::ZERO), "00:00:00");
        assert_eq!(format_clock(Duration::from_secs(57)), "00:00:57");
        assert_eq!(format_clock(Duration::from_secs(3 * 3600 + 5 * 60 + 9)), "03:05:09");
    }

    #[test]
    fn format_clock_does_not_wrap_hours() {
        assert_eq!(format_clock(Duration::from_secs(25 * 3600)), "25:00:00");
        assert_eq!(format_clock(Duration::from_secs(100 * 3600 + 1)), "100:00:01");
    }

    #[test]
    fn format_clock_has_fixed_width_below_one_hundred_hours() {
        for secs in [0, 1, 59, 60, 3599, 3600, 86_399, 359_999] {
            assert_eq!(format_clock(Duration::from_secs(secs)).len(), 8, "secs {secs}");
        }
    }

    #[test]
    fn stored_form_parses_back() {
        for secs in [0, 1, 57, 60, 61, 3600, 5400, 10_800, 90_061] {
            let duration = Duration::from_secs(secs);
            let text = format_stored(duration);
            assert_eq!(parse_duration(&text).unwrap(), duration, "text {text:?}");
        }
    }

    #[test]
    fn stored_form_drops_fractions() {
        assert_eq!(format_stored(Duration::from_millis(57_900)), "57s");
    }
}
