//! Media time value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};

use crate::domain::error::TimeParseError;

/// Position or length of media in whole milliseconds.
///
/// Displays as `MM:SS:CC` (minutes, seconds, centiseconds). Minutes are not
/// folded into hours, so two hours render as `120:00:00`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MediaTime {
    milliseconds: u64,
}

impl MediaTime {
    pub const ZERO: Self = Self::from_millis(0);

    /// Create a MediaTime from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a MediaTime from seconds, saturating at `u64::MAX` ms.
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs.saturating_mul(1000),
        }
    }

    /// `None` when the seconds do not fit in milliseconds.
    pub const fn checked_from_secs(secs: u64) -> Option<Self> {
        match secs.checked_mul(1000) {
            Some(ms) => Some(Self::from_millis(ms)),
            None => None,
        }
    }

    /// Negative inputs clamp to zero.
    pub fn from_signed_millis(ms: i64) -> Self {
        Self::from_millis(u64::try_from(ms).unwrap_or(0))
    }

    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }

    pub const fn is_zero(&self) -> bool {
        self.milliseconds == 0
    }

    pub const fn minutes(&self) -> u64 {
        self.milliseconds / 60_000
    }

    pub const fn seconds(&self) -> u64 {
        (self.milliseconds / 1000) % 60
    }

    pub const fn centiseconds(&self) -> u64 {
        (self.milliseconds % 1000) / 10
    }

    /// Drop precision below one centisecond, the resolution of `MM:SS:CC`.
    pub const fn truncated(&self) -> Self {
        Self::from_millis(self.milliseconds / 10 * 10)
    }

    pub const fn saturating_sub(self, other: Self) -> Self {
        Self::from_millis(self.milliseconds.saturating_sub(other.milliseconds))
    }
}

impl From<StdDuration> for MediaTime {
    fn from(duration: StdDuration) -> Self {
        Self::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.minutes(),
            self.seconds(),
            self.centiseconds()
        )
    }
}

impl FromStr for MediaTime {
    type Err = TimeParseError;

    /// Parse `MM:SS:CC`, or the shorthand forms "30s", "1m", "2m30s".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let parsed = if input.contains(':') {
            parse_clock(input)
        } else {
            parse_shorthand(&input.to_lowercase())
        };

        parsed.ok_or_else(|| TimeParseError {
            input: s.to_string(),
        })
    }
}

/// Format milliseconds as `MM:SS:CC`.
pub fn format_time(ms: u64) -> String {
    MediaTime::from_millis(ms).to_string()
}

fn parse_clock(input: &str) -> Option<MediaTime> {
    let mut parts = input.split(':');
    let minutes = parse_digits(parts.next()?)?;
    let seconds = parse_digits(parts.next()?)?;
    let centis = parts.next()?;

    if parts.next().is_some() || seconds >= 60 || centis.len() != 2 {
        return None;
    }
    let centis = parse_digits(centis)?;

    let total_secs = minutes.checked_mul(60)?.checked_add(seconds)?;
    let ms = total_secs.checked_mul(1000)?.checked_add(centis * 10)?;
    Some(MediaTime::from_millis(ms))
}

fn parse_digits(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_shorthand(input: &str) -> Option<MediaTime> {
    let mut minutes: u64 = 0;
    let mut seconds: u64 = 0;
    let mut current_num = String::new();
    let mut found_any = false;

    for ch in input.chars() {
        match ch {
            '0'..='9' => current_num.push(ch),
            'm' if !current_num.is_empty() => {
                minutes = current_num.parse().ok()?;
                current_num.clear();
                found_any = true;
            }
            's' if !current_num.is_empty() => {
                seconds = current_num.parse().ok()?;
                current_num.clear();
                found_any = true;
            }
            _ => return None,
        }
    }

    if !current_num.is_empty() || !found_any {
        return None;
    }

    MediaTime::checked_from_secs(minutes.checked_mul(60)?.checked_add(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_zero_padded() {
        assert_eq!(MediaTime::ZERO.to_string(), "00:00:00");
        assert_eq!(MediaTime::from_millis(1_010).to_string(), "00:01:01");
    }

    #[test]
    fn display_truncates_to_centiseconds() {
        assert_eq!(format_time(125_034), "02:05:03");
        assert_eq!(format_time(999), "00:00:99");
    }

    #[test]
    fn display_does_not_wrap_minutes() {
        assert_eq!(MediaTime::from_secs(7_200).to_string(), "120:00:00");
    }

    #[test]
    fn parse_rejects_overflowing_values() {
        assert!("999999999999999999m".parse::<MediaTime>().is_err());
        assert!("999999999999999999:00:00".parse::<MediaTime>().is_err());
        assert!("18446744073709552s".parse::<MediaTime>().is_err());
        assert!("99999999999999999999s".parse::<MediaTime>().is_err());
    }

    #[test]
    fn largest_representable_seconds_parse() {
        let t: MediaTime = "18446744073709551s".parse().unwrap();
        assert_eq!(t.as_millis(), 18_446_744_073_709_551_000);
    }

    #[test]
    fn from_secs_saturates() {
        assert_eq!(MediaTime::from_secs(u64::MAX).as_millis(), u64::MAX);
        assert!(MediaTime::checked_from_secs(u64::MAX).is_none());
        assert_eq!(
            MediaTime::checked_from_secs(3),
            Some(MediaTime::from_millis(3_000))
        );
    }

    #[test]
    fn parse_clock_format() {
        let t: MediaTime = "02:05:03".parse().unwrap();
        assert_eq!(t.as_millis(), 125_030);
    }

    #[test]
    fn format_then_parse_truncates_consistently() {
        let original = MediaTime::from_millis(125_034);
        let parsed: MediaTime = original.to_string().parse().unwrap();
        assert_eq!(parsed, original.truncated());
        assert_eq!(parsed.to_string(), original.to_string());
    }

    #[test]
    fn round_trip_at_centisecond_granularity() {
        for ms in [0, 10, 990, 59_990, 60_000, 3_599_990, 7_200_120] {
            let t = MediaTime::from_millis(ms);
            assert_eq!(t.to_string().parse::<MediaTime>().unwrap(), t);
        }
    }

    #[test]
    fn parse_clock_rejects_malformed() {
        assert!("02:05".parse::<MediaTime>().is_err());
        assert!("02:60:00".parse::<MediaTime>().is_err());
        assert!("02:05:3".parse::<MediaTime>().is_err());
        assert!("02:05:03:00".parse::<MediaTime>().is_err());
        assert!("-1:00:00".parse::<MediaTime>().is_err());
        assert!("aa:bb:cc".parse::<MediaTime>().is_err());
    }

    #[test]
    fn parse_shorthand_forms() {
        assert_eq!("30s".parse::<MediaTime>().unwrap().as_millis(), 30_000);
        assert_eq!("2m".parse::<MediaTime>().unwrap().as_millis(), 120_000);
        assert_eq!("2m30s".parse::<MediaTime>().unwrap().as_millis(), 150_000);
        assert_eq!("  1M30S ".parse::<MediaTime>().unwrap().as_millis(), 90_000);
    }

    #[test]
    fn parse_shorthand_rejects_garbage() {
        assert!("".parse::<MediaTime>().is_err());
        assert!("30".parse::<MediaTime>().is_err());
        assert!("30x".parse::<MediaTime>().is_err());
    }

    #[test]
    fn signed_millis_clamp_at_zero() {
        assert_eq!(MediaTime::from_signed_millis(-500), MediaTime::ZERO);
        assert_eq!(MediaTime::from_signed_millis(500).as_millis(), 500);
    }

    #[test]
    fn from_std_duration() {
        let t = MediaTime::from(StdDuration::from_micros(2_500_900));
        assert_eq!(t.as_millis(), 2_500);
        assert_eq!(t.as_std(), StdDuration::from_millis(2_500));
    }
}
