//! Mapping ecliptic longitudes onto the houses of a natal chart.

use serde::{Deserialize, Serialize};

use crate::error::TransitError;
use crate::houses::types::HouseCusp;
use crate::zodiac::normalize_degrees;

const ARC_SUM_TOLERANCE: f64 = 1e-6;

/// Twelve cusp longitudes, ordered by house. House *i* spans
/// `[cusp_i, cusp_{i+1})`, wrapping through 0° Aries where needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 12]", into = "[f64; 12]")]
pub struct HouseSystem {
    cusps: [f64; 12],
}

impl HouseSystem {
    /// Validates and normalizes a cusp set. Cusps must be finite and strictly
    /// increasing in circular order.
    pub fn new(cusps: [f64; 12]) -> Result<Self, TransitError> {
        if let Some(i) = cusps.iter().position(|c| !c.is_finite()) {
            return Err(TransitError::InvalidCusps {
                message: format!("cusp {} is not finite", i + 1),
            });
        }
        let cusps = cusps.map(normalize_degrees);

        let mut total = 0.0;
        for i in 0..12 {
            let arc = arc_forward(cusps[i], cusps[(i + 1) % 12]);
            if arc <= 0.0 {
                return Err(TransitError::InvalidCusps {
                    message: format!("house {} has zero width", i + 1),
                });
            }
            total += arc;
        }
        if (total - 360.0).abs() > ARC_SUM_TOLERANCE {
            return Err(TransitError::InvalidCusps {
                message: format!(
                    "cusps are not in circular order (arcs sum to {:.3} degrees)",
                    total
                ),
            });
        }

        Ok(Self { cusps })
    }

    pub fn cusps(&self) -> &[f64; 12] {
        &self.cusps
    }

    /// Cusp of house `house` (1..=12).
    pub fn cusp(&self, house: u8) -> Option<HouseCusp> {
        if !(1..=12).contains(&house) {
            return None;
        }
        Some(HouseCusp {
            house,
            longitude: self.cusps[house as usize - 1],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = HouseCusp> + '_ {
        self.cusps.iter().enumerate().map(|(i, &longitude)| HouseCusp {
            house: i as u8 + 1,
            longitude,
        })
    }

    pub fn ascendant(&self) -> f64 {
        self.cusps[0]
    }

    pub fn midheaven(&self) -> f64 {
        self.cusps[9]
    }

    /// House (1..=12) containing `longitude`. Cusps belong to the house they open.
    pub fn house_of(&self, longitude: f64) -> u8 {
        let x = normalize_degrees(longitude);
        (0..12)
            .find(|&i| {
                let start = self.cusps[i];
                let end = self.cusps[(i + 1) % 12];
                if start <= end {
                    start <= x && x < end
                } else {
                    x >= start || x < end
                }
            })
            .map(|i| i as u8 + 1)
            .unwrap_or(1)
    }
}

impl TryFrom<[f64; 12]> for HouseSystem {
    type Error = TransitError;

    fn try_from(cusps: [f64; 12]) -> Result<Self, Self::Error> {
        HouseSystem::new(cusps)
    }
}

impl From<HouseSystem> for [f64; 12] {
    fn from(system: HouseSystem) -> Self {
        system.cusps
    }
}

/// Forward arc from a to b in degrees, in [0, 360).
pub(crate) fn arc_forward(a: f64, b: f64) -> f64 {
    (b - a).rem_euclid(360.0)
}
