use chrono::{DateTime, TimeZone, Utc};
use std::env;
use std::path::{Path, PathBuf};
use swisseph::swe::{calc_ut, houses_ex, revjul, set_ephe_path};
use swisseph::{AscMc, Cusp};

use crate::ephemeris::provider::EphemerisBackend;
use crate::ephemeris::types::{BodyState, CelestialBody};
use crate::error::EphemerisError;
use crate::houses::HouseSystemKind;
use crate::zodiac::normalize_degrees;

// FLG_SWIEPH = 2, FLG_SPEED = 256
const FLG_SWIEPH: i32 = 2;
const FLG_SPEED: i32 = 256;

const DEFAULT_EPHEMERIS_PATH: &str = "/usr/local/share/swisseph";

fn planet_code(body: CelestialBody) -> u32 {
    match body {
        CelestialBody::Sun => 0,
        CelestialBody::Moon => 1,
        CelestialBody::Mercury => 2,
        CelestialBody::Venus => 3,
        CelestialBody::Mars => 4,
        CelestialBody::Jupiter => 5,
        CelestialBody::Saturn => 6,
        CelestialBody::Uranus => 7,
        CelestialBody::Neptune => 8,
        CelestialBody::Pluto => 9,
    }
}

/// Swiss Ephemeris backend. Reads the data files under `ephemeris_path` and
/// reports speeds directly, so no forward difference is needed.
#[derive(Debug, Clone)]
pub struct SwissEphemerisAdapter {
    ephemeris_path: PathBuf,
}

impl SwissEphemerisAdapter {
    /// Create a new adapter with optional ephemeris path. Falls back to
    /// `SWISS_EPHEMERIS_PATH`, then the system install location.
    ///
    /// The library keeps one search path per process; the last adapter
    /// created wins.
    pub fn new(ephemeris_path: Option<PathBuf>) -> Result<Self, EphemerisError> {
        let path = ephemeris_path.unwrap_or_else(|| {
            env::var("SWISS_EPHEMERIS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_EPHEMERIS_PATH))
        });

        if !path.exists() {
            return Err(EphemerisError::FileNotFound {
                path: path.display().to_string(),
                message: "Ephemeris path does not exist. Please ensure Swiss Ephemeris data files are installed.".to_string(),
            });
        }

        let path_str = path.to_str().ok_or_else(|| EphemerisError::FileNotFound {
            path: path.display().to_string(),
            message: "Ephemeris path is not valid UTF-8".to_string(),
        })?;
        set_ephe_path(path_str);

        log::info!("Swiss Ephemeris data at {}", path.display());
        Ok(Self {
            ephemeris_path: path,
        })
    }

    pub fn ephemeris_path(&self) -> &Path {
        &self.ephemeris_path
    }
}

impl EphemerisBackend for SwissEphemerisAdapter {
    fn name(&self) -> &str {
        "swisseph"
    }

    fn state(&self, body: CelestialBody, jd_ut: f64) -> Result<BodyState, EphemerisError> {
        let result = calc_ut(jd_ut, planet_code(body), (FLG_SWIEPH | FLG_SPEED) as u32)
            .map_err(|e| EphemerisError::Backend {
                body: body.to_string(),
                datetime: julian_day_to_datetime(jd_ut),
                message: format!("Swiss Ephemeris error: {}", e),
            })?;

        let out = result.out;
        Ok(BodyState {
            longitude: normalize_degrees(out[0]),
            speed: Some(out[3]),
        })
    }

    fn house_cusps(
        &self,
        jd_ut: f64,
        lat: f64,
        lon: f64,
        kind: HouseSystemKind,
    ) -> Option<Result<[f64; 12], EphemerisError>> {
        let (c, a) = houses_ex(jd_ut, FLG_SWIEPH, lat, lon, kind.swiss_code() as i32);
        let cusps = Cusp::from_array(c);
        let ascmc = AscMc::from_array(a);

        let values = [
            cusps.first, cusps.second, cusps.third, cusps.fourth,
            cusps.fifth, cusps.sixth, cusps.seventh, cusps.eighth,
            cusps.ninth, cusps.tenth, cusps.eleventh, cusps.twelfth,
        ];
        if values.iter().any(|v| !v.is_finite()) || !ascmc.ascendant.is_finite() {
            return Some(Err(EphemerisError::HouseCalculationFailed {
                message: format!("{} cusps undefined at latitude {:.2}", kind, lat),
            }));
        }
        Some(Ok(values.map(normalize_degrees)))
    }
}

/// Convert Julian Day to UTC datetime using the library's calendar routine.
fn julian_day_to_datetime(jd: f64) -> DateTime<Utc> {
    // GREG_CAL = 1
    let (year, month, day, hour_decimal) = revjul(jd, 1);
    let hour = hour_decimal as u32;
    let minute = ((hour_decimal - hour as f64) * 60.0) as u32;
    let second = (((hour_decimal - hour as f64) * 60.0 - minute as f64) * 60.0) as u32;
    Utc.with_ymd_and_hms(year, month as u32, day as u32, hour, minute, second)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
