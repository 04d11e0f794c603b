//! Capture times encoded in spectrum file names
//!
//! Two naming conventions are in use:
//!
//! ```text
//! spectrometer:  <label>_<day>_<HH>h<MM>m<SS>s<mmm>     e.g. IgG_1M_14_13h05m22s123
//! OSA:           <label>_<day>_<HH>_<MM>_<SS>_<mmm>     e.g. IgG_1M_14_13_05_22_123
//! ```

use std::str::FromStr;

use crate::error::{PeakFitError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// File naming convention of the capturing instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Trailing `<day>_<HH>h<MM>m<SS>s<mmm>`
    Spectrometer,

    /// Trailing `<day>_<HH>_<MM>_<SS>_<mmm>`
    Osa,
}

/// Day-of-month and time of day of a capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTime {
    pub day: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
}

impl CaptureTime {
    /// Day and clock time folded into seconds
    pub fn total_seconds(&self) -> f64 {
        self.day as f64 * SECONDS_PER_DAY
            + self.hours as f64 * SECONDS_PER_HOUR
            + self.minutes as f64 * SECONDS_PER_MINUTE
            + self.seconds as f64
            + self.milliseconds as f64 / 1000.0
    }
}

fn parse_field<T: FromStr>(token: &str, name: &str) -> Result<T> {
    token.trim().parse::<T>().map_err(|_| {
        PeakFitError::InvalidTimestamp(format!("{name} field '{token}' is not a number"))
    })
}

/// Parse the capture time from a file stem (no directory, no extension)
pub fn parse_capture_time(file_stem: &str, format: TimestampFormat) -> Result<CaptureTime> {
    let invalid = || PeakFitError::InvalidTimestamp(file_stem.to_string());
    let mut tokens = file_stem.rsplit('_');

    match format {
        TimestampFormat::Spectrometer => {
            let clock = tokens.next().ok_or_else(invalid)?;
            let day = tokens.next().ok_or_else(invalid)?;

            let (hours, rest) = clock.split_once('h').ok_or_else(invalid)?;
            let (minutes, rest) = rest.split_once('m').ok_or_else(invalid)?;
            let (seconds, millis) = rest.split_once('s').ok_or_else(invalid)?;

            Ok(CaptureTime {
                day: parse_field(day, "day")?,
                hours: parse_field(hours, "hours")?,
                minutes: parse_field(minutes, "minutes")?,
                seconds: parse_field(seconds, "seconds")?,
                milliseconds: parse_field(millis, "milliseconds")?,
            })
        }
        TimestampFormat::Osa => {
            let millis = tokens.next().ok_or_else(invalid)?;
            let seconds = tokens.next().ok_or_else(invalid)?;
            let minutes = tokens.next().ok_or_else(invalid)?;
            let hours = tokens.next().ok_or_else(invalid)?;
            let day = tokens.next().ok_or_else(invalid)?;

            Ok(CaptureTime {
                day: parse_field(day, "day")?,
                hours: parse_field(hours, "hours")?,
                minutes: parse_field(minutes, "minutes")?,
                seconds: parse_field(seconds, "seconds")?,
                milliseconds: parse_field(millis, "milliseconds")?,
            })
        }
    }
}

/// Whole seconds elapsed since the first capture
///
/// Differences are truncated toward zero. The first entry is the zero
/// point, whatever its value relative to the rest.
pub fn relative_times(total_seconds: &[f64]) -> Vec<i64> {
    let Some(&zero) = total_seconds.first() else {
        return Vec::new();
    };
    total_seconds
        .iter()
        .map(|&t| (t - zero).trunc() as i64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrometer_stem() {
        let t = parse_capture_time("IgG_1M_14_13h05m22s123", TimestampFormat::Spectrometer).unwrap();
        assert_eq!(
            t,
            CaptureTime {
                day: 14,
                hours: 13,
                minutes: 5,
                seconds: 22,
                milliseconds: 123
            }
        );
        let expected = 14.0 * 86400.0 + 13.0 * 3600.0 + 5.0 * 60.0 + 22.0 + 0.123;
        assert!((t.total_seconds() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_osa_stem() {
        let t = parse_capture_time("Salt_0.5M_02_09_59_01_500", TimestampFormat::Osa).unwrap();
        assert_eq!(t.day, 2);
        assert_eq!(t.hours, 9);
        assert_eq!(t.minutes, 59);
        assert_eq!(t.seconds, 1);
        assert!((t.total_seconds() - (2.0 * 86400.0 + 9.0 * 3600.0 + 59.0 * 60.0 + 1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_stems() {
        for stem in ["nounderscore", "IgG_14_13h05m", "IgG_x_13h05m22s1", "IgG_14_13h05m22s"] {
            assert!(
                matches!(
                    parse_capture_time(stem, TimestampFormat::Spectrometer),
                    Err(PeakFitError::InvalidTimestamp(_))
                ),
                "{}",
                stem
            );
        }
        assert!(parse_capture_time("a_1_2_3", TimestampFormat::Osa).is_err());
    }

    #[test]
    fn test_non_numeric_milliseconds_rejected() {
        for stem in [
            "IgG_14_13h05m22sNaN",
            "IgG_14_13h05m22sinf",
            "IgG_14_13h05m22s-5",
            "IgG_14_13h05m22s1.5",
        ] {
            assert!(
                matches!(
                    parse_capture_time(stem, TimestampFormat::Spectrometer),
                    Err(PeakFitError::InvalidTimestamp(_))
                ),
                "{}",
                stem
            );
        }
        for stem in ["S_02_09_59_01_NaN", "S_02_09_59_01_inf", "S_02_09_59_01_-1"] {
            assert!(parse_capture_time(stem, TimestampFormat::Osa).is_err(), "{}", stem);
        }
    }

    #[test]
    fn test_relative_times_truncate() {
        assert_eq!(relative_times(&[100.9, 101.0, 160.95, 100.0]), vec![0, 0, 60, 0]);
        assert!(relative_times(&[]).is_empty());
    }
}
