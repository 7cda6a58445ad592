//! Conversion between archive day counts and calendar time
//!
//! Archives store a point in time as two doubles: whole days since
//! 1899-12-30 and the elapsed fraction of the current day.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{EvtarcError, Result};

/// Largest day count the archive can hold (9999-12-31)
pub const MAX_ARCHIVE_DAYS: f64 = 2_958_465.0;

const NANOS_PER_DAY: i64 = 86_400_000_000_000;

/// The archive epoch, 1899-12-30 00:00:00
#[must_use]
pub fn archive_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("1899-12-30 is a valid calendar date")
}

/// Convert a (days, day fraction) pair to calendar time.
///
/// Negative inputs clamp to the epoch instead of failing.
///
/// # Errors
///
/// Returns [`EvtarcError::InvalidFormat`] for non-finite values or dates past
/// 9999-12-31
pub fn stamp_from_days(days: f64, fraction: f64) -> Result<NaiveDateTime> {
    if !days.is_finite() || !fraction.is_finite() {
        return Err(EvtarcError::InvalidFormat(format!(
            "non-finite timestamp ({days}, {fraction})"
        )));
    }
    if days < 0.0 || fraction < 0.0 {
        return Ok(archive_epoch());
    }

    let combined = days.fract() + fraction;
    let whole_days = days.trunc() + combined.trunc();
    if whole_days > MAX_ARCHIVE_DAYS {
        return Err(EvtarcError::InvalidFormat(format!(
            "timestamp of {whole_days} days is past the last representable date"
        )));
    }

    let nanos = (combined.fract() * NANOS_PER_DAY as f64).round() as i64;
    Ok(archive_epoch() + Duration::days(whole_days as i64) + Duration::nanoseconds(nanos))
}

/// Convert calendar time to a (days, day fraction) pair.
///
/// Stamps before the epoch are written as the epoch.
///
/// # Errors
///
/// Returns [`EvtarcError::LimitExceeded`] for stamps past 9999-12-31, which
/// the archive cannot hold
pub fn stamp_to_days(stamp: NaiveDateTime) -> Result<(f64, f64)> {
    let delta = stamp - archive_epoch();
    if delta < Duration::zero() {
        return Ok((0.0, 0.0));
    }

    let days = delta.num_days();
    if days as f64 > MAX_ARCHIVE_DAYS {
        return Err(EvtarcError::limit("timestamp days", days, MAX_ARCHIVE_DAYS as u64));
    }

    let remainder = (delta - Duration::days(days))
        .num_nanoseconds()
        .unwrap_or(0);
    Ok((days as f64, remainder as f64 / NANOS_PER_DAY as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_epoch() {
        assert_eq!(stamp_from_days(0.0, 0.0).unwrap(), at(1899, 12, 30, 0, 0, 0));
        assert_eq!(stamp_to_days(archive_epoch()).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn test_known_date() {
        // 2000-01-01 is day 36526 in the archive calendar
        let (days, fraction) = stamp_to_days(at(2000, 1, 1, 12, 0, 0)).unwrap();
        assert_eq!(days, 36_526.0);
        assert_eq!(fraction, 0.5);
        assert_eq!(stamp_from_days(36_526.0, 0.5).unwrap(), at(2000, 1, 1, 12, 0, 0));
    }

    #[test]
    fn test_fractional_day_count() {
        assert_eq!(stamp_from_days(36_526.25, 0.25).unwrap(), at(2000, 1, 1, 12, 0, 0));
    }

    #[test]
    fn test_roundtrip_subsecond() {
        let stamp = at(2021, 6, 15, 8, 30, 17) + Duration::microseconds(123_456);
        let (days, fraction) = stamp_to_days(stamp).unwrap();
        assert_eq!(stamp_from_days(days, fraction).unwrap(), stamp);
    }

    #[test]
    fn test_negative_clamps_to_epoch() {
        assert_eq!(stamp_from_days(-5.0, 0.3).unwrap(), archive_epoch());
        assert_eq!(stamp_from_days(3.0, -0.1).unwrap(), archive_epoch());
        assert_eq!(stamp_to_days(at(1850, 1, 1, 0, 0, 0)).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(stamp_from_days(f64::NAN, 0.0).unwrap_err().is_data_error());
        assert!(stamp_from_days(0.0, f64::INFINITY).unwrap_err().is_data_error());
        assert!(stamp_from_days(1.0e12, 0.0).unwrap_err().is_data_error());
    }

    #[test]
    fn test_last_representable_day() {
        let last = at(9999, 12, 31, 23, 59, 59);
        let (days, fraction) = stamp_to_days(last).unwrap();
        assert_eq!(days, MAX_ARCHIVE_DAYS);
        assert_eq!(stamp_from_days(days, fraction).unwrap(), last);
    }

    #[test]
    fn test_stamp_past_last_day_fails_on_write() {
        let err = stamp_to_days(at(10_500, 1, 1, 0, 0, 0)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Limit);
    }
}
