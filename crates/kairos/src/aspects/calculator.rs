use crate::aspects::types::{Aspect, AspectMatch, AspectSnapshot, OrbPolicy, ASPECTS};
use crate::ephemeris::{CelestialBody, Position};

/// Orb below which an aspect is reported as exact.
const EXACT_ORB: f64 = 0.1;
/// Look-ahead used to decide whether an orb is shrinking, days.
const APPLYING_STEP_DAYS: f64 = 0.1;

/// Shortest angular distance between two longitudes, in [0, 180].
pub fn angular_separation(a: f64, b: f64) -> f64 {
    let raw = (a - b).abs().rem_euclid(360.0);
    if raw > 180.0 {
        360.0 - raw
    } else {
        raw
    }
}

/// Closest major aspect between two longitudes within `tolerance`.
///
/// Symmetric in `a` and `b`. When two aspects qualify the smaller orb wins.
pub fn match_aspect(a: f64, b: f64, tolerance: f64) -> Option<AspectMatch> {
    let separation = angular_separation(a, b);
    ASPECTS
        .iter()
        .map(|aspect| AspectMatch {
            aspect: *aspect,
            orb: (separation - aspect.exact_angle).abs(),
        })
        .filter(|m| m.orb <= tolerance)
        .min_by(|x, y| x.orb.total_cmp(&y.orb))
}

/// Whether a transiting body moving at `transiting_speed` is closing on the
/// exact aspect to a fixed natal longitude.
pub fn is_applying(transiting_lon: f64, transiting_speed: f64, natal_lon: f64, aspect: &Aspect) -> bool {
    let current_distance = (angular_separation(transiting_lon, natal_lon) - aspect.exact_angle).abs();
    let future_lon = transiting_lon + transiting_speed * APPLYING_STEP_DAYS;
    let future_distance = (angular_separation(future_lon, natal_lon) - aspect.exact_angle).abs();
    future_distance < current_distance
}

/// Matches transiting positions against natal ones under an [`OrbPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AspectMatcher {
    policy: OrbPolicy,
}

impl AspectMatcher {
    pub fn new(policy: OrbPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OrbPolicy {
        &self.policy
    }

    pub fn tolerance(&self, transiting: CelestialBody, natal: CelestialBody) -> f64 {
        self.policy.tolerance(transiting, natal)
    }

    pub fn match_bodies(
        &self,
        transiting: CelestialBody,
        transiting_lon: f64,
        natal: CelestialBody,
        natal_lon: f64,
    ) -> Option<AspectMatch> {
        match_aspect(transiting_lon, natal_lon, self.tolerance(transiting, natal))
    }

    /// The aspect, if any, between a transiting position and a natal one right now.
    pub fn snapshot(
        &self,
        transiting: CelestialBody,
        position: &Position,
        natal: CelestialBody,
        natal_position: &Position,
    ) -> Option<AspectSnapshot> {
        let m = self.match_bodies(transiting, position.longitude, natal, natal_position.longitude)?;
        Some(AspectSnapshot {
            natal_body: natal,
            aspect: m.aspect,
            orb: m.orb,
            is_applying: is_applying(position.longitude, position.speed, natal_position.longitude, &m.aspect),
            is_exact: m.orb < EXACT_ORB,
        })
    }
}
