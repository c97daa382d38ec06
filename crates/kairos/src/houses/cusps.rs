//! House cusps from the local sidereal time and geographic latitude.
//!
//! Cusp 1 = Ascendant, 4 = IC, 7 = Descendant, 10 = MC. Placidus trisects
//! each cusp's own diurnal or nocturnal semi-arc, iterating on its
//! declination; Porphyry trisects the ecliptic arcs between the angles.

use crate::ephemeris::time::{local_sidereal_degrees, mean_obliquity_degrees};
use crate::error::TransitError;
use crate::houses::system::arc_forward;
use crate::houses::types::HouseSystemKind;
use crate::zodiac::normalize_degrees;

/// Beyond this latitude quadrant systems are rejected.
pub const QUADRANT_LATITUDE_LIMIT: f64 = 66.0;

const PLACIDUS_MAX_ITERATIONS: usize = 50;
const PLACIDUS_TOLERANCE_DEG: f64 = 1e-9;

/// Compute the 12 cusps of `kind` for an instant and an observer.
pub fn compute_cusps(
    kind: HouseSystemKind,
    jd_ut: f64,
    latitude: f64,
    longitude_east: f64,
) -> Result<[f64; 12], TransitError> {
    if kind.is_latitude_limited() && latitude.abs() > QUADRANT_LATITUDE_LIMIT {
        return Err(TransitError::GeodeticRange {
            system: kind.to_string(),
            latitude,
            limit: QUADRANT_LATITUDE_LIMIT,
        });
    }

    let ramc = local_sidereal_degrees(jd_ut, longitude_east);
    let eps = mean_obliquity_degrees(jd_ut);
    let (asc, mc) = angles(ramc, latitude, eps);

    let cusps = match kind {
        HouseSystemKind::Equal => compute_equal(asc),
        HouseSystemKind::Porphyry => compute_porphyry(asc, mc),
        HouseSystemKind::Placidus => compute_placidus(asc, mc, ramc, latitude, eps),
    };
    Ok(cusps)
}

/// Ascendant and Midheaven longitudes for a RAMC, latitude and obliquity (degrees).
pub fn angles(ramc: f64, latitude: f64, eps: f64) -> (f64, f64) {
    let r = ramc.to_radians();
    let e = eps.to_radians();
    let phi = latitude.to_radians();

    let mc = f64::atan2(r.sin(), r.cos() * e.cos()).to_degrees();
    let asc = f64::atan2(r.cos(), -(r.sin() * e.cos() + phi.tan() * e.sin())).to_degrees();
    (normalize_degrees(asc), normalize_degrees(mc))
}

fn compute_equal(asc: f64) -> [f64; 12] {
    let mut cusps = [0.0; 12];
    for (i, cusp) in cusps.iter_mut().enumerate() {
        *cusp = normalize_degrees(asc + i as f64 * 30.0);
    }
    cusps
}

fn compute_porphyry(asc: f64, mc: f64) -> [f64; 12] {
    let mut cusps = with_angles(asc, mc);

    let upper = arc_forward(mc, asc);
    cusps[10] = normalize_degrees(mc + upper / 3.0);
    cusps[11] = normalize_degrees(mc + 2.0 * upper / 3.0);

    let lower = 180.0 - upper;
    cusps[1] = normalize_degrees(asc + lower / 3.0);
    cusps[2] = normalize_degrees(asc + 2.0 * lower / 3.0);

    fill_opposites(&mut cusps);
    cusps
}

fn compute_placidus(asc: f64, mc: f64, ramc: f64, latitude: f64, eps: f64) -> [f64; 12] {
    let mut cusps = with_angles(asc, mc);

    cusps[10] = placidus_cusp(ramc, latitude, eps, |dsa| dsa / 3.0);
    cusps[11] = placidus_cusp(ramc, latitude, eps, |dsa| 2.0 * dsa / 3.0);
    cusps[1] = placidus_cusp(ramc, latitude, eps, |dsa| dsa + (180.0 - dsa) / 3.0);
    cusps[2] = placidus_cusp(ramc, latitude, eps, |dsa| dsa + 2.0 * (180.0 - dsa) / 3.0);

    fill_opposites(&mut cusps);
    cusps
}

/// Solve for the ecliptic point whose right ascension sits `offset(dsa)`
/// east of the meridian, `dsa` being that point's own diurnal semi-arc.
fn placidus_cusp(ramc: f64, latitude: f64, eps: f64, offset: impl Fn(f64) -> f64) -> f64 {
    let mut lon = ecliptic_longitude_of_ra(ramc + offset(90.0), eps);
    for _ in 0..PLACIDUS_MAX_ITERATIONS {
        let dsa = diurnal_semi_arc(declination_of(lon, eps), latitude);
        let next = ecliptic_longitude_of_ra(ramc + offset(dsa), eps);
        let delta = (next - lon + 540.0).rem_euclid(360.0) - 180.0;
        lon = next;
        if delta.abs() < PLACIDUS_TOLERANCE_DEG {
            break;
        }
    }
    lon
}

fn with_angles(asc: f64, mc: f64) -> [f64; 12] {
    let mut cusps = [0.0; 12];
    cusps[0] = asc;
    cusps[3] = normalize_degrees(mc + 180.0);
    cusps[6] = normalize_degrees(asc + 180.0);
    cusps[9] = mc;
    cusps
}

/// Houses 5, 6, 8, 9 lie opposite 11, 12, 2, 3.
fn fill_opposites(cusps: &mut [f64; 12]) {
    cusps[4] = normalize_degrees(cusps[10] + 180.0);
    cusps[5] = normalize_degrees(cusps[11] + 180.0);
    cusps[7] = normalize_degrees(cusps[1] + 180.0);
    cusps[8] = normalize_degrees(cusps[2] + 180.0);
}

/// Diurnal semi-arc in degrees: `acos(-tan φ tan δ)`.
fn diurnal_semi_arc(declination: f64, latitude: f64) -> f64 {
    let cos_h = -(declination.to_radians().tan() * latitude.to_radians().tan());
    cos_h.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Declination of an ecliptic point (zero latitude).
fn declination_of(lon: f64, eps: f64) -> f64 {
    (eps.to_radians().sin() * lon.to_radians().sin()).asin().to_degrees()
}

/// Ecliptic longitude of the ecliptic point with right ascension `ra`.
fn ecliptic_longitude_of_ra(ra: f64, eps: f64) -> f64 {
    let a = ra.to_radians();
    normalize_degrees(f64::atan2(a.sin(), a.cos() * eps.to_radians().cos()).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::houses::HouseSystem;

    const EPS: f64 = 23.4393;
    const JD: f64 = 2_448_027.0; // 1990-05-15 12:00 UT

    fn right_ascension_of(lon: f64, eps: f64) -> f64 {
        let l = lon.to_radians();
        normalize_degrees(f64::atan2(l.sin() * eps.to_radians().cos(), l.cos()).to_degrees())
    }

    #[test]
    fn test_angles_at_equator() {
        let (asc, mc) = angles(0.0, 0.0, EPS);
        assert!(mc.abs() < 1e-9 || (mc - 360.0).abs() < 1e-9);
        assert!((asc - 90.0).abs() < 1e-9);

        let (asc, mc) = angles(90.0, 0.0, EPS);
        assert!((mc - 90.0).abs() < 1e-9);
        assert!((asc - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_ascendant_is_east_of_midheaven() {
        for ramc in [0.0, 45.0, 133.0, 250.0, 333.0] {
            for lat in [-50.0, 0.0, 40.7, 60.0] {
                let (asc, mc) = angles(ramc, lat, EPS);
                let arc = arc_forward(mc, asc);
                assert!(arc > 0.0 && arc < 180.0, "ramc {ramc} lat {lat}: arc {arc}");
            }
        }
    }

    #[test]
    fn test_all_kinds_give_valid_systems() {
        for kind in HouseSystemKind::ALL {
            for lat in [-45.0, 0.0, 40.7128, 60.0] {
                let cusps = compute_cusps(kind, JD, lat, -74.006).unwrap();
                let houses = HouseSystem::new(cusps).unwrap();
                let (asc, _) = angles(local_sidereal_degrees(JD, -74.006), lat, mean_obliquity_degrees(JD));
                assert!((houses.ascendant() - asc).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_placidus_cusp_trisects_semi_arc() {
        let lat = 40.7128;
        let ramc = 123.4;
        let (asc, mc) = angles(ramc, lat, EPS);
        let cusps = compute_placidus(asc, mc, ramc, lat, EPS);

        let c11 = cusps[10];
        let dsa = diurnal_semi_arc(declination_of(c11, EPS), lat);
        let hour_offset = arc_forward(ramc, right_ascension_of(c11, EPS));
        assert!((hour_offset - dsa / 3.0).abs() < 1e-6);

        let c2 = cusps[1];
        let dsa = diurnal_semi_arc(declination_of(c2, EPS), lat);
        let hour_offset = arc_forward(ramc, right_ascension_of(c2, EPS));
        assert!((hour_offset - (dsa + (180.0 - dsa) / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_placidus_at_equator() {
        // at the equator every semi-arc is 90 degrees, so the cusps sit at RAMC + 30k
        let ramc = 10.0;
        let (asc, mc) = angles(ramc, 0.0, EPS);
        let cusps = compute_placidus(asc, mc, ramc, 0.0, EPS);
        for (i, offset) in [(10usize, 30.0), (11, 60.0), (1, 120.0), (2, 150.0)] {
            let ra = right_ascension_of(cusps[i], EPS);
            assert!((arc_forward(ramc, ra) - offset).abs() < 1e-6);
        }
    }

    #[test]
    fn test_equal_counts_from_ascendant() {
        let cusps = compute_cusps(HouseSystemKind::Equal, JD, 51.5, 0.0).unwrap();
        for i in 1..12 {
            assert!((arc_forward(cusps[i - 1], cusps[i]) - 30.0).abs() < 1e-9);
        }
        assert!(cusps[0] % 30.0 != 0.0);
    }

    #[test]
    fn test_polar_latitude_rejected_for_quadrant_systems() {
        for kind in [HouseSystemKind::Placidus, HouseSystemKind::Porphyry] {
            let err = compute_cusps(kind, JD, 69.65, 18.96).unwrap_err();
            assert!(matches!(err, TransitError::GeodeticRange { .. }));
            let err = compute_cusps(kind, JD, -66.5, 18.96).unwrap_err();
            assert!(matches!(err, TransitError::GeodeticRange { .. }));
        }
        assert!(compute_cusps(HouseSystemKind::Equal, JD, 69.65, 18.96).is_ok());
    }
}
