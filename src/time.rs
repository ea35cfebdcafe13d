//! Time conversions: Julian dates, TLE epochs and sidereal time.
//!
//! Instants are `chrono::DateTime<Utc>`; the propagators work in minutes
//! since the element-set epoch.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

use crate::constants::*;

/// Julian date of the Unix epoch (1970-01-01T00:00:00 UTC).
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// Julian date of J2000 (2000-01-01T12:00:00).
pub const JD_J2000: f64 = 2_451_545.0;

/// Julian date of 1950 Jan 0.0 (1949-12-31T00:00:00), the SDP4 time origin.
pub const JD_1950_JAN0: f64 = 2_433_281.5;

/// Julian date of an instant.
pub fn julian_date(t: &DateTime<Utc>) -> f64 {
    let secs = t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9;
    JD_UNIX_EPOCH + secs / SECONDS_PER_DAY
}

/// Days elapsed since 1950 Jan 0.0 — the `ds50` argument of the deep-space terms.
pub fn days_since_1950(t: &DateTime<Utc>) -> f64 {
    julian_date(t) - JD_1950_JAN0
}

/// Build an instant from a full year and a fractional day of year.
///
/// Day 1.0 is January 1 at 00:00 UTC, day 1.5 is January 1 at noon.
/// Returns `None` for day values past the end of that year (`[1, 366)`, or
/// `[1, 367)` in leap years) or years chrono cannot represent.
pub fn epoch_from_year_day(year: i32, day: f64) -> Option<DateTime<Utc>> {
    let days_in_year = NaiveDate::from_ymd_opt(year, 12, 31)?.ordinal() as f64;
    if !(1.0..days_in_year + 1.0).contains(&day) {
        return None;
    }
    let jan1 = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let offset_ns = ((day - 1.0) * SECONDS_PER_DAY * 1e9).round() as i64;
    jan1.checked_add_signed(Duration::nanoseconds(offset_ns))
}

/// Shift an instant by a (possibly negative, fractional) number of minutes.
pub fn add_minutes(t: &DateTime<Utc>, minutes: f64) -> Option<DateTime<Utc>> {
    if !minutes.is_finite() {
        return None;
    }
    let ns = minutes * 60.0 * 1e9;
    if ns.abs() >= i64::MAX as f64 {
        return None;
    }
    t.checked_add_signed(Duration::nanoseconds(ns.round() as i64))
}

/// Minutes from `from` to `to` (negative if `to` is earlier).
pub fn minutes_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    let delta = *to - *from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 60.0e6,
        None => delta.num_seconds() as f64 / 60.0,
    }
}

/// Greenwich Mean Sidereal Time (rad, [0, 2π)).
///
/// IAU 1982 polynomial in Julian centuries of UT1 (UTC is used as UT1),
/// per the 1992 Astronomical Almanac, page B6.
pub fn gmst(t: &DateTime<Utc>) -> f64 {
    let ut = (t.num_seconds_from_midnight() as f64 + t.nanosecond().min(999_999_999) as f64 * 1e-9)
        / SECONDS_PER_DAY;
    let jd0 = julian_date(t) - ut;
    let tu = (jd0 - JD_J2000) / 36525.0;

    let gmst0 = 24110.54841 + tu * (8640184.812866 + tu * (0.093104 - tu * 6.2e-6));
    let mut secs = (gmst0 + SECONDS_PER_DAY * OMEGA_E * ut) % SECONDS_PER_DAY;
    if secs < 0.0 {
        secs += SECONDS_PER_DAY;
    }
    TAU * secs / SECONDS_PER_DAY
}

/// Local Mean Sidereal Time (rad, [0, 2π)) for an east-positive longitude (rad).
pub fn lmst(t: &DateTime<Utc>, lon: f64) -> f64 {
    fmod2p(gmst(t) + lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_julian_date_j2000() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_relative_eq!(julian_date(&t), JD_J2000, epsilon = 1e-9);
    }

    #[test]
    fn test_epoch_from_year_day() {
        let t = epoch_from_year_day(2024, 1.5).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());

        let t = epoch_from_year_day(1980, 275.0).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(1980, 10, 1, 0, 0, 0).unwrap());

        assert!(epoch_from_year_day(2024, 0.5).is_none());
        assert!(epoch_from_year_day(2024, 400.0).is_none());
    }

    #[test]
    fn test_day_366_only_in_leap_years() {
        let t = epoch_from_year_day(2024, 366.25).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 12, 31, 6, 0, 0).unwrap());

        assert!(epoch_from_year_day(2023, 366.25).is_none());
        assert!(epoch_from_year_day(1900, 366.0).is_none());
        let last = epoch_from_year_day(2023, 365.999).unwrap();
        assert_eq!(last.year(), 2023);
    }

    #[test]
    fn test_gmst_reference_value() {
        // Vallado example 3-5: 1992-08-20 12:14 UT1 -> GMST 152.578787886°
        let t = Utc.with_ymd_and_hms(1992, 8, 20, 12, 14, 0).unwrap();
        assert_relative_eq!(gmst(&t) * RAD2DEG, 152.578787886, epsilon = 1e-4);
    }

    #[test]
    fn test_gmst_advances_one_sidereal_turn_per_day() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t1 = add_minutes(&t0, MINUTES_PER_DAY).unwrap();
        let drift = fmod2p(gmst(&t1) - gmst(&t0));
        // 0.00273790934 turns gained per solar day
        assert_relative_eq!(drift, TAU * (OMEGA_E - 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_lmst_offsets_by_longitude() {
        let t = Utc.with_ymd_and_hms(2010, 6, 1, 3, 30, 0).unwrap();
        let lon = 75.0 * DEG2RAD;
        assert_relative_eq!(lmst(&t, lon), fmod2p(gmst(&t) + lon), epsilon = 1e-12);
    }

    #[test]
    fn test_minutes_round_trip() {
        let t0 = Utc.with_ymd_and_hms(2020, 2, 29, 23, 0, 0).unwrap();
        let t1 = add_minutes(&t0, -90.5).unwrap();
        assert_relative_eq!(minutes_between(&t0, &t1), -90.5, epsilon = 1e-9);
        assert!(add_minutes(&t0, f64::NAN).is_none());
    }
}
