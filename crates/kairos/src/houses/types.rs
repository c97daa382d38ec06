use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// House division used when a chart is cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseSystemKind {
    #[default]
    Placidus,
    Porphyry,
    /// 30° houses counted from the Ascendant, not from 0° Aries.
    Equal,
}

impl HouseSystemKind {
    pub const ALL: [HouseSystemKind; 3] = [
        HouseSystemKind::Placidus,
        HouseSystemKind::Porphyry,
        HouseSystemKind::Equal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HouseSystemKind::Placidus => "placidus",
            HouseSystemKind::Porphyry => "porphyry",
            HouseSystemKind::Equal => "equal",
        }
    }

    /// Quadrant systems lose their meaning near the polar circles.
    pub fn is_latitude_limited(self) -> bool {
        matches!(self, HouseSystemKind::Placidus | HouseSystemKind::Porphyry)
    }

    /// House system byte understood by the Swiss Ephemeris.
    pub fn swiss_code(self) -> u8 {
        match self {
            HouseSystemKind::Placidus => b'P',
            HouseSystemKind::Porphyry => b'O',
            HouseSystemKind::Equal => b'E',
        }
    }
}

impl fmt::Display for HouseSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HouseSystemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        HouseSystemKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| {
                format!(
                    "Invalid house system: {}. Valid systems: placidus, porphyry, equal",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HouseCusp {
    /// 1..=12
    pub house: u8,
    pub longitude: f64,
}
