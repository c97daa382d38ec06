use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::zodiac::{get_sign_index, normalize_degrees, ZodiacSign};

/// Geographic location coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Degrees north (negative south)
    pub lat: f64,
    /// Degrees east (negative west)
    pub lon: f64,
}

/// Orb category of a body. Personal bodies move fast and get a wider orb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyCategory {
    Personal,
    Outer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CelestialBody {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl CelestialBody {
    pub const ALL: [CelestialBody; 10] = [
        CelestialBody::Sun,
        CelestialBody::Moon,
        CelestialBody::Mercury,
        CelestialBody::Venus,
        CelestialBody::Mars,
        CelestialBody::Jupiter,
        CelestialBody::Saturn,
        CelestialBody::Uranus,
        CelestialBody::Neptune,
        CelestialBody::Pluto,
    ];

    /// The slow bodies a transit report is usually asked for.
    pub const OUTER: [CelestialBody; 5] = [
        CelestialBody::Jupiter,
        CelestialBody::Saturn,
        CelestialBody::Uranus,
        CelestialBody::Neptune,
        CelestialBody::Pluto,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CelestialBody::Sun => "sun",
            CelestialBody::Moon => "moon",
            CelestialBody::Mercury => "mercury",
            CelestialBody::Venus => "venus",
            CelestialBody::Mars => "mars",
            CelestialBody::Jupiter => "jupiter",
            CelestialBody::Saturn => "saturn",
            CelestialBody::Uranus => "uranus",
            CelestialBody::Neptune => "neptune",
            CelestialBody::Pluto => "pluto",
        }
    }

    pub fn category(self) -> BodyCategory {
        match self {
            CelestialBody::Sun
            | CelestialBody::Moon
            | CelestialBody::Mercury
            | CelestialBody::Venus
            | CelestialBody::Mars => BodyCategory::Personal,
            _ => BodyCategory::Outer,
        }
    }

    /// Mean geocentric motion in degrees per day, used when no speed can be sampled.
    pub fn mean_daily_motion(self) -> f64 {
        match self {
            CelestialBody::Sun => 0.9856,
            CelestialBody::Moon => 13.1764,
            CelestialBody::Mercury => 1.383,
            CelestialBody::Venus => 1.2,
            CelestialBody::Mars => 0.524,
            CelestialBody::Jupiter => 0.083,
            CelestialBody::Saturn => 0.034,
            CelestialBody::Uranus => 0.0117,
            CelestialBody::Neptune => 0.006,
            CelestialBody::Pluto => 0.004,
        }
    }

    /// Sun and Moon never move backwards geocentrically.
    pub fn can_retrograde(self) -> bool {
        !matches!(self, CelestialBody::Sun | CelestialBody::Moon)
    }

    /// Shortest retrograde period observed for the body, in days.
    pub fn shortest_retrograde_days(self) -> Option<f64> {
        match self {
            CelestialBody::Sun | CelestialBody::Moon => None,
            CelestialBody::Mercury => Some(19.0),
            CelestialBody::Venus => Some(40.0),
            CelestialBody::Mars => Some(58.0),
            CelestialBody::Jupiter => Some(118.0),
            CelestialBody::Saturn => Some(133.0),
            CelestialBody::Uranus => Some(148.0),
            CelestialBody::Neptune => Some(155.0),
            CelestialBody::Pluto => Some(155.0),
        }
    }
}

impl fmt::Display for CelestialBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CelestialBody {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        CelestialBody::ALL
            .iter()
            .copied()
            .find(|body| body.id() == lower)
            .ok_or_else(|| format!("Unknown body ID: {}", s))
    }
}

/// Raw output of a backend: ecliptic longitude of date and, when the backend
/// can provide it, the longitude speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub longitude: f64,
    pub speed: Option<f64>,
}

/// Position of a body at an instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Longitude in degrees (0-360)
    pub longitude: f64,
    pub sign_index: u8,
    /// Degrees into the sign (0-30)
    pub degree_in_sign: f64,
    /// Speed in longitude (degrees per day)
    pub speed: f64,
    /// Whether the planet is retrograde
    pub retrograde: bool,
}

impl Position {
    pub fn new(longitude: f64, speed: f64) -> Self {
        let longitude = normalize_degrees(longitude);
        let sign_index = get_sign_index(longitude);
        let degree_in_sign = (longitude - sign_index as f64 * 30.0).clamp(0.0, 30.0 - f64::EPSILON * 64.0);
        Self {
            longitude,
            sign_index,
            degree_in_sign,
            speed,
            retrograde: speed < 0.0,
        }
    }

    pub fn sign(&self) -> ZodiacSign {
        ZodiacSign::from_index(self.sign_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_derived_fields() {
        let pos = Position::new(60.1410124933791, 0.0429);
        assert_eq!(pos.sign(), ZodiacSign::Gemini);
        assert!((pos.degree_in_sign - 0.14101249337910104).abs() < 1e-9);
        assert!(!pos.retrograde);

        let pos = Position::new(-57.0678416277252, -0.0225);
        assert!((pos.longitude - 302.9321583722748).abs() < 1e-9);
        assert_eq!(pos.sign(), ZodiacSign::Aquarius);
        assert!(pos.retrograde);
    }

    #[test]
    fn test_body_round_trips_through_id() {
        for body in CelestialBody::ALL {
            assert_eq!(body.id().parse::<CelestialBody>(), Ok(body));
        }
        assert!("ascendant".parse::<CelestialBody>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(CelestialBody::Mars.category(), BodyCategory::Personal);
        assert_eq!(CelestialBody::Jupiter.category(), BodyCategory::Outer);
        assert!(!CelestialBody::Moon.can_retrograde());
        assert!(CelestialBody::Pluto.can_retrograde());
    }
}
