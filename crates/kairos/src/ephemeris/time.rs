//! Julian day conversions and the sidereal-time / obliquity helpers the
//! house computation needs.
//!
//! GMST polynomial: Capitaine et al. 2003. Mean obliquity: IAU 1980 (Lieske).

use chrono::{DateTime, Duration, TimeZone, Utc};

pub const J2000_JD: f64 = 2_451_545.0;
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Convert UTC datetime to Julian Day
pub fn datetime_to_julian_day(dt: DateTime<Utc>) -> f64 {
    UNIX_EPOCH_JD + dt.timestamp_millis() as f64 / MILLIS_PER_DAY
}

/// Convert Julian Day to UTC datetime, rounded to the millisecond.
///
/// Returns `None` when the day number is outside chrono's representable range.
pub fn julian_day_to_datetime(jd: f64) -> Option<DateTime<Utc>> {
    if !jd.is_finite() {
        return None;
    }
    let millis = ((jd - UNIX_EPOCH_JD) * MILLIS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Julian centuries since J2000.0
pub fn centuries_since_j2000(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_CENTURY
}

/// A span of fractional days as a chrono duration (millisecond resolution).
pub fn days(span: f64) -> Duration {
    Duration::milliseconds((span * MILLIS_PER_DAY).round() as i64)
}

/// Fractional days between two instants (`to - from`).
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Greenwich Mean Sidereal Time in degrees [0, 360).
pub fn gmst_degrees(jd_ut: f64) -> f64 {
    let du = jd_ut - J2000_JD;
    let era = 360.0 * (0.779_057_273_264_0 + 1.002_737_811_911_354_6 * du);
    let t = du / DAYS_PER_CENTURY;
    let poly_arcsec = 0.014506 + 4612.156534 * t + 1.3915817 * t * t
        - 0.00000044 * t.powi(3)
        - 0.000029956 * t.powi(4)
        - 0.0000000368 * t.powi(5);
    (era + poly_arcsec / 3600.0).rem_euclid(360.0)
}

/// Local sidereal time (= RAMC) in degrees for an east longitude.
pub fn local_sidereal_degrees(jd_ut: f64, longitude_east: f64) -> f64 {
    (gmst_degrees(jd_ut) + longitude_east).rem_euclid(360.0)
}

/// Mean obliquity of the ecliptic of date, degrees.
pub fn mean_obliquity_degrees(jd: f64) -> f64 {
    let t = centuries_since_j2000(jd);
    let arcsec = 21.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t.powi(3);
    23.0 + 26.0 / 60.0 + arcsec / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_j2000_round_trip() {
        let dt = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((datetime_to_julian_day(dt) - J2000_JD).abs() < 1e-9);
        assert_eq!(julian_day_to_datetime(J2000_JD), Some(dt));
    }

    #[test]
    fn test_gmst_j2000_midnight() {
        // 2000-01-01 0h UT: GMST ~ 6h 39m 51s = 99.96 deg
        let g = gmst_degrees(2_451_544.5);
        assert!((g - 99.97).abs() < 0.1, "gmst = {g}");
    }

    #[test]
    fn test_obliquity_j2000() {
        let eps = mean_obliquity_degrees(J2000_JD);
        assert!((eps - 23.4392911).abs() < 1e-6);
    }

    #[test]
    fn test_days_helpers() {
        let a = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let b = a + days(1.5);
        assert!((days_between(a, b) - 1.5).abs() < 1e-9);
    }
}
