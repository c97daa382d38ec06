use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ephemeris::time::days_between;
use crate::ephemeris::{BodyCategory, CelestialBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectKind {
    Conjunction,
    Sextile,
    Square,
    Trine,
    Opposition,
}

impl AspectKind {
    pub fn name(self) -> &'static str {
        match self {
            AspectKind::Conjunction => "conjunction",
            AspectKind::Sextile => "sextile",
            AspectKind::Square => "square",
            AspectKind::Trine => "trine",
            AspectKind::Opposition => "opposition",
        }
    }

    pub fn aspect(self) -> Aspect {
        ASPECTS[self as usize]
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectNature {
    Harmonious,
    Challenging,
}

/// One of the five major aspects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aspect {
    pub kind: AspectKind,
    /// Exact angle for this aspect (0, 60, 90, 120, 180)
    pub exact_angle: f64,
    pub nature: AspectNature,
}

/// The major aspects, indexed by [`AspectKind`]. Conjunction counts as harmonious.
pub const ASPECTS: [Aspect; 5] = [
    Aspect {
        kind: AspectKind::Conjunction,
        exact_angle: 0.0,
        nature: AspectNature::Harmonious,
    },
    Aspect {
        kind: AspectKind::Sextile,
        exact_angle: 60.0,
        nature: AspectNature::Harmonious,
    },
    Aspect {
        kind: AspectKind::Square,
        exact_angle: 90.0,
        nature: AspectNature::Challenging,
    },
    Aspect {
        kind: AspectKind::Trine,
        exact_angle: 120.0,
        nature: AspectNature::Harmonious,
    },
    Aspect {
        kind: AspectKind::Opposition,
        exact_angle: 180.0,
        nature: AspectNature::Challenging,
    },
];

/// Result of matching two longitudes against the aspect table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectMatch {
    pub aspect: Aspect,
    /// Deviation from the exact angle, degrees
    pub orb: f64,
}

/// Orb tolerance applied to a pair of bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrbPolicy {
    /// Per-category orbs; a pair uses the tighter of its two bodies.
    CategoryBased { personal: f64, outer: f64 },
    /// One orb for every pair.
    Flat(f64),
}

impl OrbPolicy {
    pub const DEFAULT_PERSONAL_ORB: f64 = 5.0;
    pub const DEFAULT_OUTER_ORB: f64 = 3.0;
    pub const DEFAULT_FLAT_ORB: f64 = 5.0;

    pub fn flat() -> Self {
        OrbPolicy::Flat(Self::DEFAULT_FLAT_ORB)
    }

    pub fn orb_for(&self, body: CelestialBody) -> f64 {
        match *self {
            OrbPolicy::CategoryBased { personal, outer } => match body.category() {
                BodyCategory::Personal => personal,
                BodyCategory::Outer => outer,
            },
            OrbPolicy::Flat(orb) => orb,
        }
    }

    pub fn tolerance(&self, a: CelestialBody, b: CelestialBody) -> f64 {
        self.orb_for(a).min(self.orb_for(b))
    }
}

impl Default for OrbPolicy {
    fn default() -> Self {
        OrbPolicy::CategoryBased {
            personal: Self::DEFAULT_PERSONAL_ORB,
            outer: Self::DEFAULT_OUTER_ORB,
        }
    }
}

/// An aspect in force at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectSnapshot {
    pub natal_body: CelestialBody,
    pub aspect: Aspect,
    pub orb: f64,
    /// Whether the orb is shrinking
    pub is_applying: bool,
    /// Whether the aspect is exact (within 0.1 degrees)
    pub is_exact: bool,
}

/// A transiting body holding an aspect to a natal body over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectInstance {
    pub transiting_body: CelestialBody,
    pub natal_body: CelestialBody,
    pub aspect: Aspect,
    pub orb_at_center: f64,
    pub window_start: DateTime<Utc>,
    /// Instant of minimum orb
    pub window_center: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub tolerance: f64,
    /// The window was already active when the search began and its start
    /// could not be located.
    pub open_start: bool,
    /// The window was still active at the search limit.
    pub open_end: bool,
}

impl AspectInstance {
    pub fn duration_days(&self) -> f64 {
        days_between(self.window_start, self.window_end)
    }

    pub fn overlaps(&self, other: &AspectInstance) -> bool {
        self.window_start < other.window_end && other.window_start < self.window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_indexed_by_kind() {
        for aspect in ASPECTS {
            assert_eq!(aspect.kind.aspect(), aspect);
        }
        assert_eq!(AspectKind::Conjunction.aspect().nature, AspectNature::Harmonious);
        assert_eq!(AspectKind::Square.aspect().exact_angle, 90.0);
    }

    #[test]
    fn test_category_orbs() {
        let policy = OrbPolicy::default();
        assert_eq!(policy.tolerance(CelestialBody::Sun, CelestialBody::Mars), 5.0);
        assert_eq!(policy.tolerance(CelestialBody::Sun, CelestialBody::Pluto), 3.0);
        assert_eq!(policy.tolerance(CelestialBody::Saturn, CelestialBody::Venus), 3.0);

        let flat = OrbPolicy::flat();
        assert_eq!(flat.tolerance(CelestialBody::Saturn, CelestialBody::Pluto), 5.0);
    }

    #[test]
    fn test_policy_serde_shape() {
        let json = serde_json::to_string(&OrbPolicy::Flat(4.0)).unwrap();
        assert_eq!(json, r#"{"flat":4.0}"#);
        let back: OrbPolicy = serde_json::from_str(r#"{"category_based":{"personal":6.0,"outer":2.0}}"#).unwrap();
        assert_eq!(back.orb_for(CelestialBody::Moon), 6.0);
    }
}
