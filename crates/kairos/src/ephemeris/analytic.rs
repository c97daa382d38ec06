//! Analytic approximate ephemeris.
//!
//! Planets: Keplerian mean elements with linear rates referred to the J2000
//! ecliptic (Standish, "Approximate Positions of the Planets", table valid
//! 1800-2050). Geocentric vectors are formed against the Earth-Moon
//! barycenter, corrected for light-time, then carried to the equinox of date
//! with general precession, the principal nutation terms and annual
//! aberration.
//!
//! Moon: the largest periodic terms of the lunar theory in Meeus,
//! "Astronomical Algorithms" ch. 47, already referred to the mean equinox of
//! date.
//!
//! Accuracy is in the arcminute range for the planets over the valid span,
//! enough to date outer-planet ingresses and stations to well under a day.
//! The backend exposes no speed; the provider derives one numerically.

use chrono::{DateTime, Utc};

use crate::ephemeris::provider::EphemerisBackend;
use crate::ephemeris::time::centuries_since_j2000;
use crate::ephemeris::types::{BodyState, CelestialBody};
use crate::error::EphemerisError;
use crate::zodiac::normalize_degrees;

/// Light travel time for one astronomical unit, in days.
const LIGHT_TIME_DAYS_PER_AU: f64 = 0.005_775_518_3;
/// Constant of aberration, degrees.
const ABERRATION_DEG: f64 = 20.495_52 / 3600.0;

/// First and last Julian day covered by the element table (1800-01-01, 2050-12-31).
const VALID_FROM_JD: f64 = 2_378_496.5;
const VALID_TO_JD: f64 = 2_470_171.5;

/// Mean elements at J2000 and their rates per Julian century:
/// a (au), e, I (deg), L (deg), long. perihelion (deg), long. node (deg).
#[derive(Debug, Clone, Copy)]
struct OrbitalElements {
    at_epoch: [f64; 6],
    per_century: [f64; 6],
}

const EARTH_MOON_BARYCENTER: OrbitalElements = OrbitalElements {
    at_epoch: [1.000_002_61, 0.016_711_23, -0.000_015_31, 100.464_571_66, 102.937_681_93, 0.0],
    per_century: [0.000_005_62, -0.000_043_92, -0.012_946_68, 35_999.372_449_81, 0.323_273_64, 0.0],
};

fn elements_for(body: CelestialBody) -> Option<OrbitalElements> {
    let elements = match body {
        CelestialBody::Mercury => OrbitalElements {
            at_epoch: [0.387_099_27, 0.205_635_93, 7.004_979_02, 252.250_323_50, 77.457_796_28, 48.330_765_93],
            per_century: [0.000_000_37, 0.000_019_06, -0.005_947_49, 149_472.674_111_75, 0.160_476_89, -0.125_340_81],
        },
        CelestialBody::Venus => OrbitalElements {
            at_epoch: [0.723_335_66, 0.006_776_72, 3.394_676_05, 181.979_099_50, 131.602_467_18, 76.679_842_55],
            per_century: [0.000_003_90, -0.000_041_07, -0.000_788_90, 58_517.815_387_29, 0.002_683_29, -0.277_694_18],
        },
        CelestialBody::Mars => OrbitalElements {
            at_epoch: [1.523_710_34, 0.093_394_10, 1.849_691_42, -4.553_432_05, -23.943_629_59, 49.559_538_91],
            per_century: [0.000_018_47, 0.000_078_82, -0.008_131_31, 19_140.302_684_99, 0.444_410_88, -0.292_573_43],
        },
        CelestialBody::Jupiter => OrbitalElements {
            at_epoch: [5.202_887_00, 0.048_386_24, 1.304_396_95, 34.396_440_51, 14.728_479_83, 100.473_909_09],
            per_century: [-0.000_116_07, -0.000_132_53, -0.001_837_14, 3_034.746_127_75, 0.212_526_68, 0.204_691_06],
        },
        CelestialBody::Saturn => OrbitalElements {
            at_epoch: [9.536_675_94, 0.053_861_79, 2.485_991_87, 49.954_244_23, 92.598_878_31, 113.662_424_48],
            per_century: [-0.001_250_60, -0.000_509_91, 0.001_936_09, 1_222.493_622_01, -0.418_972_16, -0.288_677_94],
        },
        CelestialBody::Uranus => OrbitalElements {
            at_epoch: [19.189_164_64, 0.047_257_44, 0.772_637_83, 313.238_104_51, 170.954_276_30, 74.016_925_03],
            per_century: [-0.001_961_76, -0.000_043_97, -0.002_429_39, 428.482_027_85, 0.408_052_81, 0.042_405_89],
        },
        CelestialBody::Neptune => OrbitalElements {
            at_epoch: [30.069_922_76, 0.008_590_48, 1.770_043_47, -55.120_029_69, 44.964_762_27, 131.784_225_74],
            per_century: [0.000_262_91, 0.000_051_05, 0.000_353_72, 218.459_453_25, -0.322_414_64, -0.005_086_64],
        },
        CelestialBody::Pluto => OrbitalElements {
            at_epoch: [39.482_116_75, 0.248_827_30, 17.140_012_06, 238.929_038_33, 224.068_916_29, 110.303_936_84],
            per_century: [-0.000_315_96, 0.000_051_70, 0.000_048_18, 145.207_805_15, -0.040_629_42, -0.011_834_82],
        },
        CelestialBody::Sun | CelestialBody::Moon => return None,
    };
    Some(elements)
}

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Longitude and latitude (degrees) of a J2000 ecliptic vector.
fn spherical(v: Vec3) -> (f64, f64) {
    let lon = v[1].atan2(v[0]).to_degrees();
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt()).to_degrees();
    (normalize_degrees(lon), lat)
}

fn wrap_180(deg: f64) -> f64 {
    let mut d = deg.rem_euclid(360.0);
    if d > 180.0 {
        d -= 360.0;
    }
    d
}

/// Solve Kepler's equation; `mean_anomaly` in degrees, returns the eccentric anomaly in degrees.
fn eccentric_anomaly(mean_anomaly: f64, e: f64) -> f64 {
    let e_deg = e.to_degrees();
    let mut ecc = mean_anomaly + e_deg * mean_anomaly.to_radians().sin();
    for _ in 0..30 {
        let delta_m = mean_anomaly - (ecc - e_deg * ecc.to_radians().sin());
        let delta_e = delta_m / (1.0 - e * ecc.to_radians().cos());
        ecc += delta_e;
        if delta_e.abs() < 1e-9 {
            break;
        }
    }
    ecc
}

/// Heliocentric J2000 ecliptic position (au) from mean elements at `t` centuries.
fn heliocentric(elements: &OrbitalElements, t: f64) -> Vec3 {
    let el: [f64; 6] = std::array::from_fn(|k| elements.at_epoch[k] + elements.per_century[k] * t);
    let (a, e, incl, mean_lon, peri, node) = (el[0], el[1], el[2], el[3], el[4], el[5]);

    let arg_peri = (peri - node).to_radians();
    let mean_anomaly = wrap_180(mean_lon - peri);
    let ecc = eccentric_anomaly(mean_anomaly, e).to_radians();

    let x_orb = a * (ecc.cos() - e);
    let y_orb = a * (1.0 - e * e).sqrt() * ecc.sin();

    let (sw, cw) = arg_peri.sin_cos();
    let (so, co) = node.to_radians().sin_cos();
    let (si, ci) = incl.to_radians().sin_cos();

    [
        (cw * co - sw * so * ci) * x_orb + (-sw * co - cw * so * ci) * y_orb,
        (cw * so + sw * co * ci) * x_orb + (-sw * so + cw * co * ci) * y_orb,
        (sw * si) * x_orb + (cw * si) * y_orb,
    ]
}

/// Nutation in longitude (degrees), principal terms.
fn nutation_in_longitude(t: f64) -> f64 {
    let node = (125.044_52 - 1_934.136_261 * t).to_radians();
    let sun_mean = (280.4665 + 36_000.7698 * t).to_radians();
    let moon_mean = (218.3165 + 481_267.8813 * t).to_radians();
    let arcsec = -17.20 * node.sin() - 1.32 * (2.0 * sun_mean).sin() - 0.23 * (2.0 * moon_mean).sin()
        + 0.21 * (2.0 * node).sin();
    arcsec / 3600.0
}

/// General precession in longitude from J2000 to the equinox of date (degrees).
fn precession_in_longitude(t: f64) -> f64 {
    (5_028.796_195 * t + 1.105_434_8 * t * t) / 3600.0
}

/// Apparent geocentric longitude of the Moon (degrees), mean equinox of date plus nutation.
fn moon_longitude(t: f64) -> f64 {
    let l_prime = 218.316_447_7 + 481_267.881_234_21 * t;
    let d = (297.850_192_1 + 445_267.111_403_4 * t).to_radians();
    let m = (357.529_109_2 + 35_999.050_290_9 * t).to_radians();
    let m_prime = (134.963_396_4 + 477_198.867_505_5 * t).to_radians();
    let f = (93.272_095_0 + 483_202.017_523_3 * t).to_radians();
    let ecc = 1.0 - 0.002_516 * t;

    // (coefficient, D, M, M', F) in degrees; terms with M scale by E^|M|
    const TERMS: &[(f64, f64, f64, f64, f64)] = &[
        (6.288_774, 0.0, 0.0, 1.0, 0.0),
        (1.274_027, 2.0, 0.0, -1.0, 0.0),
        (0.658_314, 2.0, 0.0, 0.0, 0.0),
        (0.213_618, 0.0, 0.0, 2.0, 0.0),
        (-0.185_116, 0.0, 1.0, 0.0, 0.0),
        (-0.114_332, 0.0, 0.0, 0.0, 2.0),
        (0.058_793, 2.0, 0.0, -2.0, 0.0),
        (0.057_066, 2.0, -1.0, -1.0, 0.0),
        (0.053_322, 2.0, 0.0, 1.0, 0.0),
        (0.045_758, 2.0, -1.0, 0.0, 0.0),
        (-0.040_923, 0.0, 1.0, -1.0, 0.0),
        (-0.034_720, 1.0, 0.0, 0.0, 0.0),
        (-0.030_383, 0.0, 1.0, 1.0, 0.0),
        (0.015_327, 2.0, 0.0, 0.0, -2.0),
        (-0.012_528, 0.0, 0.0, 1.0, 2.0),
        (0.010_980, 0.0, 0.0, 1.0, -2.0),
        (0.010_675, 4.0, 0.0, -1.0, 0.0),
        (0.010_034, 0.0, 0.0, 3.0, 0.0),
        (0.008_548, 4.0, 0.0, -2.0, 0.0),
        (-0.007_888, 2.0, 1.0, -1.0, 0.0),
        (-0.006_766, 2.0, 1.0, 0.0, 0.0),
        (-0.005_163, 1.0, 0.0, -1.0, 0.0),
    ];

    let perturbation: f64 = TERMS
        .iter()
        .map(|&(coeff, cd, cm, cmp, cf)| {
            let arg = cd * d + cm * m + cmp * m_prime + cf * f;
            coeff * ecc.powi(cm.abs() as i32) * arg.sin()
        })
        .sum();

    normalize_degrees(l_prime + perturbation + nutation_in_longitude(t))
}

/// Analytic approximate backend; stateless and cheap to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticEphemeris;

impl AnalyticEphemeris {
    pub fn new() -> Self {
        Self
    }

    fn check_range(&self, jd: f64) -> Result<(), EphemerisError> {
        if (VALID_FROM_JD..=VALID_TO_JD).contains(&jd) {
            return Ok(());
        }
        Err(EphemerisError::OutOfRange {
            backend: self.name().to_string(),
            datetime: crate::ephemeris::time::julian_day_to_datetime(jd)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            valid: "1800-01-01..2050-12-31".to_string(),
        })
    }

    /// Apparent geocentric ecliptic longitude (degrees, equinox of date).
    pub fn apparent_longitude(&self, body: CelestialBody, jd: f64) -> Result<f64, EphemerisError> {
        self.check_range(jd)?;
        let t = centuries_since_j2000(jd);

        if body == CelestialBody::Moon {
            return Ok(moon_longitude(t));
        }

        let earth = heliocentric(&EARTH_MOON_BARYCENTER, t);
        let sun_geocentric = [-earth[0], -earth[1], -earth[2]];
        let (sun_lon_j2000, _) = spherical(sun_geocentric);

        let geocentric = match elements_for(body) {
            None => sun_geocentric,
            Some(elements) => {
                let first = sub(heliocentric(&elements, t), earth);
                let light_time = LIGHT_TIME_DAYS_PER_AU * norm(first);
                let retarded = t - light_time / crate::ephemeris::time::DAYS_PER_CENTURY;
                sub(heliocentric(&elements, retarded), earth)
            }
        };

        let (lon_j2000, lat) = spherical(geocentric);
        let elongation = (sun_lon_j2000 - lon_j2000).to_radians();
        let aberration = -ABERRATION_DEG * elongation.cos() / lat.to_radians().cos();

        Ok(normalize_degrees(
            lon_j2000 + aberration + precession_in_longitude(t) + nutation_in_longitude(t),
        ))
    }
}

impl EphemerisBackend for AnalyticEphemeris {
    fn name(&self) -> &str {
        "analytic"
    }

    fn state(&self, body: CelestialBody, jd_ut: f64) -> Result<BodyState, EphemerisError> {
        Ok(BodyState {
            longitude: self.apparent_longitude(body, jd_ut)?,
            speed: None,
        })
    }

    fn valid_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let from = crate::ephemeris::time::julian_day_to_datetime(VALID_FROM_JD)?;
        let to = crate::ephemeris::time::julian_day_to_datetime(VALID_TO_JD)?;
        Some((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::time::datetime_to_julian_day;
    use chrono::TimeZone;

    fn jd(y: i32, m: u32, d: u32, h: u32) -> f64 {
        datetime_to_julian_day(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    fn angular_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).abs() % 360.0;
        d.min(360.0 - d)
    }

    #[test]
    fn test_kepler_circular_orbit() {
        assert!((eccentric_anomaly(42.0, 0.0) - 42.0).abs() < 1e-12);
    }

    #[test]
    fn test_sun_at_march_equinox_2025() {
        // Equinox 2025-03-20 09:01 UT
        let lon = AnalyticEphemeris.apparent_longitude(CelestialBody::Sun, jd(2025, 3, 20, 9)).unwrap();
        assert!(angular_distance(lon, 0.0) < 0.05, "sun = {lon}");
    }

    #[test]
    fn test_fixture_positions_2025_07_10() {
        // Transit fixture: Sun 108.53, Uranus 60.141, Pluto 302.932, Saturn 1.929
        let eph = AnalyticEphemeris;
        let t = jd(2025, 7, 10, 12);
        let sun = eph.apparent_longitude(CelestialBody::Sun, t).unwrap();
        assert!(angular_distance(sun, 108.53) < 0.3, "sun = {sun}");
        let uranus = eph.apparent_longitude(CelestialBody::Uranus, t).unwrap();
        let pluto = eph.apparent_longitude(CelestialBody::Pluto, t).unwrap();
        let saturn = eph.apparent_longitude(CelestialBody::Saturn, t).unwrap();
        assert!(angular_distance(uranus, 60.14) < 0.2, "uranus = {uranus}");
        assert!(angular_distance(pluto, 302.93) < 0.3, "pluto = {pluto}");
        assert!(angular_distance(saturn, 1.93) < 0.5, "saturn = {saturn}");
    }

    #[test]
    fn test_moon_is_fast() {
        let eph = AnalyticEphemeris;
        let a = eph.apparent_longitude(CelestialBody::Moon, jd(2025, 1, 1, 0)).unwrap();
        let b = eph.apparent_longitude(CelestialBody::Moon, jd(2025, 1, 2, 0)).unwrap();
        let motion = (b - a).rem_euclid(360.0);
        assert!((11.0..16.0).contains(&motion), "moon motion = {motion}");
    }

    #[test]
    fn test_out_of_range() {
        let err = AnalyticEphemeris
            .state(CelestialBody::Mars, jd(2100, 1, 1, 0))
            .unwrap_err();
        assert!(matches!(err, EphemerisError::OutOfRange { .. }));
    }

    #[test]
    fn test_outer_node_rates() {
        let node_rate = |body| elements_for(body).map(|e| e.per_century[5]);
        assert_eq!(node_rate(CelestialBody::Neptune), Some(-0.005_086_64));
        assert_eq!(node_rate(CelestialBody::Pluto), Some(-0.011_834_82));
        assert_eq!(node_rate(CelestialBody::Sun), None);
    }
}
