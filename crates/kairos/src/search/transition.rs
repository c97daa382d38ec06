//! Locating the instant a predicate over a body's position changes value.
//!
//! A coarse fixed-step scan finds a bracket, then bisection narrows it to
//! `precision_days`. Only the first change after the start is reported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ephemeris::time::{days, days_between};
use crate::ephemeris::{CelestialBody, Position, PositionSource};
use crate::error::{EphemerisError, TransitError};

/// Tunables shared by every search in the crate. All spans are in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub coarse_step_days: f64,
    /// Bisection stops once the bracket is narrower than this.
    pub precision_days: f64,
    pub max_iterations: u32,
    /// How far past the scan limits a window boundary may be searched.
    pub max_extension_days: f64,
    pub velocity_step_days: f64,
    pub retrograde_step_days: f64,
    pub aspect_step_days: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            coarse_step_days: 1.0,
            precision_days: 1.0 / 1440.0,
            max_iterations: 60,
            max_extension_days: 400.0,
            velocity_step_days: 0.1,
            retrograde_step_days: 2.0,
            aspect_step_days: 1.0,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), TransitError> {
        let spans = [
            ("coarse_step_days", self.coarse_step_days),
            ("precision_days", self.precision_days),
            ("max_extension_days", self.max_extension_days),
            ("velocity_step_days", self.velocity_step_days),
            ("retrograde_step_days", self.retrograde_step_days),
            ("aspect_step_days", self.aspect_step_days),
        ];
        for (name, value) in spans {
            if !value.is_finite() || value <= 0.0 {
                return Err(TransitError::InvalidInput {
                    message: format!("{} must be a positive number of days, got {}", name, value),
                });
            }
        }
        if self.max_iterations == 0 {
            return Err(TransitError::InvalidInput {
                message: "max_iterations must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    fn offset(self, from: DateTime<Utc>, span_days: f64) -> DateTime<Utc> {
        match self {
            SearchDirection::Forward => from + days(span_days),
            SearchDirection::Backward => from - days(span_days),
        }
    }
}

pub struct TransitionFinder<'a, P: ?Sized> {
    source: &'a P,
    config: SearchConfig,
}

impl<'a, P: PositionSource + ?Sized> TransitionFinder<'a, P> {
    pub fn new(source: &'a P, config: SearchConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn source(&self) -> &'a P {
        self.source
    }

    /// First instant after (or before, for [`SearchDirection::Backward`])
    /// `from` at which `predicate` no longer has the value it has at `from`.
    ///
    /// The returned instant lies on the new-value side of the change, within
    /// `precision_days` of it. Fails with [`TransitError::NotFound`] when no
    /// change happens within `max_horizon_days`.
    pub fn find_transition<F>(
        &self,
        body: CelestialBody,
        predicate: F,
        from: DateTime<Utc>,
        direction: SearchDirection,
        max_horizon_days: f64,
        coarse_step_days: f64,
    ) -> Result<DateTime<Utc>, TransitError>
    where
        F: Fn(&Position) -> bool,
    {
        if !coarse_step_days.is_finite() || coarse_step_days <= 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("coarse step must be positive, got {}", coarse_step_days),
            });
        }
        if !max_horizon_days.is_finite() || max_horizon_days < 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("horizon must be non-negative, got {}", max_horizon_days),
            });
        }

        let baseline = predicate(&self.source.position_of(body, from)?);
        let mut t_old = from;
        let mut elapsed = 0.0;

        while elapsed < max_horizon_days {
            elapsed = (elapsed + coarse_step_days).min(max_horizon_days);
            let t_new = direction.offset(from, elapsed);
            match self.source.position_of(body, t_new) {
                Ok(position) => {
                    if predicate(&position) != baseline {
                        return Ok(self.bisect(body, &predicate, t_old, t_new, !baseline));
                    }
                    t_old = t_new;
                }
                Err(EphemerisError::Cancelled) => return Err(EphemerisError::Cancelled.into()),
                Err(e) => {
                    log::warn!("Skipping {} sample at {}: {}", body, t_new, e);
                }
            }
        }

        Err(TransitError::NotFound {
            horizon_days: max_horizon_days,
        })
    }

    /// Narrow a bracket whose ends disagree on `predicate` down to the
    /// configured precision. Returns the end on `t_new`'s side.
    pub fn refine<F>(
        &self,
        body: CelestialBody,
        predicate: &F,
        t_old: DateTime<Utc>,
        t_new: DateTime<Utc>,
    ) -> DateTime<Utc>
    where
        F: Fn(&Position) -> bool,
    {
        match self.source.position_of(body, t_new) {
            Ok(position) => self.bisect(body, predicate, t_old, t_new, predicate(&position)),
            Err(e) => {
                log::warn!("Cannot refine {} bracket ending {}: {}", body, t_new, e);
                t_new
            }
        }
    }

    fn bisect<F>(
        &self,
        body: CelestialBody,
        predicate: &F,
        mut old: DateTime<Utc>,
        mut new: DateTime<Utc>,
        new_value: bool,
    ) -> DateTime<Utc>
    where
        F: Fn(&Position) -> bool,
    {
        for _ in 0..self.config.max_iterations {
            if days_between(old, new).abs() <= self.config.precision_days {
                break;
            }
            let mid = old + (new - old) / 2;
            match self.source.position_of(body, mid) {
                Ok(position) => {
                    if predicate(&position) == new_value {
                        new = mid;
                    } else {
                        old = mid;
                    }
                }
                Err(e) => {
                    log::warn!("Bisection for {} stopped at {}: {}", body, mid, e);
                    break;
                }
            }
        }
        new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EphemerisError;
    use chrono::TimeZone;

    /// Longitude = 10 + 0.5 * days since the epoch.
    struct Steady {
        epoch: DateTime<Utc>,
    }

    impl PositionSource for Steady {
        fn position_of(&self, _body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
            Ok(Position::new(10.0 + 0.5 * days_between(self.epoch, instant), 0.5))
        }
    }

    /// Fails for a window of instants.
    struct Gappy {
        inner: Steady,
        gap: (DateTime<Utc>, DateTime<Utc>),
    }

    impl PositionSource for Gappy {
        fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
            if instant >= self.gap.0 && instant <= self.gap.1 {
                return Err(EphemerisError::Backend {
                    body: body.to_string(),
                    datetime: instant,
                    message: "gap".to_string(),
                });
            }
            self.inner.position_of(body, instant)
        }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_finds_monotonic_crossing() {
        let source = Steady { epoch: epoch() };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        // longitude reaches 30 (Taurus) after exactly 40 days
        let t = finder
            .find_transition(CelestialBody::Mars, |p| p.sign_index == 0, epoch(), SearchDirection::Forward, 100.0, 1.0)
            .unwrap();
        let expected = epoch() + days(40.0);
        assert!(days_between(expected, t).abs() <= 1.0 / 1440.0);
        assert!(t >= expected, "returned instant must be on the new side");
    }

    #[test]
    fn test_backward_crossing() {
        let source = Steady { epoch: epoch() };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        let from = epoch() + days(55.0);
        let t = finder
            .find_transition(CelestialBody::Mars, |p| p.sign_index == 1, from, SearchDirection::Backward, 100.0, 1.0)
            .unwrap();
        let expected = epoch() + days(40.0);
        assert!(days_between(expected, t).abs() <= 1.0 / 1440.0);
        assert!(t < expected);
    }

    #[test]
    fn test_not_found_within_horizon() {
        let source = Steady { epoch: epoch() };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        let err = finder
            .find_transition(CelestialBody::Mars, |p| p.sign_index == 0, epoch(), SearchDirection::Forward, 20.0, 1.0)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_uneven_final_step_reaches_horizon() {
        let source = Steady { epoch: epoch() };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        // the crossing at day 40 is only reachable by the clipped last step
        let t = finder
            .find_transition(CelestialBody::Mars, |p| p.sign_index == 0, epoch(), SearchDirection::Forward, 40.5, 7.0)
            .unwrap();
        assert!(days_between(epoch() + days(40.0), t).abs() <= 1.0 / 1440.0);
    }

    #[test]
    fn test_failed_samples_are_skipped() {
        let source = Gappy {
            inner: Steady { epoch: epoch() },
            gap: (epoch() + days(20.5), epoch() + days(25.5)),
        };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        let t = finder
            .find_transition(CelestialBody::Mars, |p| p.sign_index == 0, epoch(), SearchDirection::Forward, 100.0, 1.0)
            .unwrap();
        assert!(days_between(epoch() + days(40.0), t).abs() <= 1.0 / 1440.0);
    }

    #[test]
    fn test_baseline_failure_propagates() {
        let source = Gappy {
            inner: Steady { epoch: epoch() },
            gap: (epoch(), epoch()),
        };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        let err = finder
            .find_transition(CelestialBody::Mars, |p| p.sign_index == 0, epoch(), SearchDirection::Forward, 100.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, TransitError::Ephemeris(_)));
    }

    #[test]
    fn test_refine_existing_bracket() {
        let source = Steady { epoch: epoch() };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        let old = epoch() + days(35.0);
        let new = epoch() + days(45.0);
        let t = finder.refine(CelestialBody::Mars, &|p: &Position| p.longitude >= 30.0, old, new);
        assert!(days_between(epoch() + days(40.0), t).abs() <= 1.0 / 1440.0);
    }

    #[test]
    fn test_rejects_bad_step() {
        let source = Steady { epoch: epoch() };
        let finder = TransitionFinder::new(&source, SearchConfig::default());
        let err = finder
            .find_transition(CelestialBody::Mars, |_| true, epoch(), SearchDirection::Forward, 10.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, TransitError::InvalidInput { .. }));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
        let bad = SearchConfig {
            precision_days: -1.0,
            ..SearchConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
