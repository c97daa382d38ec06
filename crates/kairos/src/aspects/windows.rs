//! Time windows during which a transiting body holds an aspect to a fixed
//! natal longitude.

use chrono::{DateTime, Utc};

use crate::aspects::calculator::{angular_separation, match_aspect};
use crate::aspects::types::{Aspect, AspectInstance, AspectKind, AspectMatch};
use crate::ephemeris::time::{days, days_between};
use crate::ephemeris::{CelestialBody, Position, PositionSource};
use crate::error::{EphemerisError, TransitError, TransitResultExt};
use crate::search::{SearchConfig, SearchDirection, TransitionFinder};

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_8;
/// Peak speed over mean speed, with room to spare.
const STEP_SPEED_MARGIN: f64 = 1.5;

struct OpenWindow {
    aspect: Aspect,
    start: DateTime<Utc>,
    open_start: bool,
}

pub struct AspectWindowFinder<'a, P: ?Sized> {
    finder: TransitionFinder<'a, P>,
}

impl<'a, P: PositionSource + ?Sized> AspectWindowFinder<'a, P> {
    pub fn new(source: &'a P, config: SearchConfig) -> Self {
        Self {
            finder: TransitionFinder::new(source, config),
        }
    }

    /// Every window in which `transiting_body` is within `tolerance` of a
    /// major aspect to `natal_longitude`, over `[from, from + horizon_days]`.
    ///
    /// Windows are disjoint and returned in time order. A switch from one
    /// aspect to another between two samples closes the first window and
    /// opens a second.
    #[allow(clippy::too_many_arguments)]
    pub fn find_aspect_windows(
        &self,
        transiting_body: CelestialBody,
        natal_body: CelestialBody,
        natal_longitude: f64,
        tolerance: f64,
        from: DateTime<Utc>,
        horizon_days: f64,
        step_days: f64,
    ) -> Result<Vec<AspectInstance>, TransitError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("orb tolerance must be non-negative, got {}", tolerance),
            });
        }
        if !step_days.is_finite() || step_days <= 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("aspect step must be positive, got {}", step_days),
            });
        }
        if !horizon_days.is_finite() || horizon_days < 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("horizon must be non-negative, got {}", horizon_days),
            });
        }

        // the narrowest window a fast body can make must still be sampled
        let max_step = tolerance / (STEP_SPEED_MARGIN * transiting_body.mean_daily_motion());
        let step_days = if tolerance > 0.0 && step_days > max_step {
            log::debug!(
                "Clamping {} aspect step from {} to {:.3} days",
                transiting_body,
                step_days,
                max_step
            );
            max_step
        } else {
            step_days
        };

        let source = self.finder.source();
        let extension = self.finder.config().max_extension_days;
        let horizon_end = from + days(horizon_days);
        let matches = |p: &Position| match_aspect(p.longitude, natal_longitude, tolerance);
        let mut windows = Vec::new();

        let first = matches(&source.position_of(transiting_body, from)?);
        let mut open = match first {
            Some(m) => {
                let within = holds_aspect(natal_longitude, m.aspect.kind, tolerance);
                let start = self
                    .finder
                    .find_transition(transiting_body, within, from, SearchDirection::Backward, extension, step_days)
                    .found()?;
                Some(OpenWindow {
                    aspect: m.aspect,
                    start: start.unwrap_or(from),
                    open_start: start.is_none(),
                })
            }
            None => None,
        };
        let mut current: Option<AspectMatch> = first;
        let mut t_prev = from;
        let mut elapsed = 0.0;

        while elapsed < horizon_days {
            elapsed = (elapsed + step_days).min(horizon_days);
            let t = from + days(elapsed);
            let sample = match source.position_of(transiting_body, t) {
                Ok(p) => matches(&p),
                Err(EphemerisError::Cancelled) => return Err(EphemerisError::Cancelled.into()),
                Err(e) => {
                    log::warn!("Skipping {} sample at {}: {}", transiting_body, t, e);
                    continue;
                }
            };

            let changed = match (&current, &sample) {
                (None, None) => false,
                (Some(a), Some(b)) => a.aspect.kind != b.aspect.kind,
                _ => true,
            };
            if changed {
                if let Some(window) = open.take() {
                    let within = holds_aspect(natal_longitude, window.aspect.kind, tolerance);
                    let end = self.finder.refine(transiting_body, &within, t_prev, t);
                    windows.push(self.finish(transiting_body, natal_body, natal_longitude, tolerance, step_days, window, end, false));
                }
                if let Some(m) = &sample {
                    let within = holds_aspect(natal_longitude, m.aspect.kind, tolerance);
                    open = Some(OpenWindow {
                        aspect: m.aspect,
                        start: self.finder.refine(transiting_body, &within, t_prev, t),
                        open_start: false,
                    });
                }
            }
            current = sample;
            t_prev = t;
        }

        if let Some(window) = open {
            let within = holds_aspect(natal_longitude, window.aspect.kind, tolerance);
            let end = self
                .finder
                .find_transition(transiting_body, within, t_prev, SearchDirection::Forward, extension, step_days)
                .found()?;
            let open_end = end.is_none();
            let end = end.unwrap_or(horizon_end);
            windows.push(self.finish(transiting_body, natal_body, natal_longitude, tolerance, step_days, window, end, open_end));
        }

        Ok(windows)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        transiting_body: CelestialBody,
        natal_body: CelestialBody,
        natal_longitude: f64,
        tolerance: f64,
        step_days: f64,
        window: OpenWindow,
        end: DateTime<Utc>,
        open_end: bool,
    ) -> AspectInstance {
        let (center, orb) = self.locate_center(transiting_body, natal_longitude, window.aspect, window.start, end, step_days);
        AspectInstance {
            transiting_body,
            natal_body,
            aspect: window.aspect,
            orb_at_center: orb,
            window_start: window.start,
            window_center: center,
            window_end: end,
            tolerance,
            open_start: window.open_start,
            open_end,
        }
    }

    /// Instant of minimum orb inside `[start, end]`: best coarse sample,
    /// then golden-section search in the neighbouring steps.
    fn locate_center(
        &self,
        body: CelestialBody,
        natal_longitude: f64,
        aspect: Aspect,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_days: f64,
    ) -> (DateTime<Utc>, f64) {
        let source = self.finder.source();
        let config = self.finder.config();
        let orb_at = |offset: f64| -> f64 {
            source
                .position_of(body, start + days(offset))
                .map(|p| (angular_separation(p.longitude, natal_longitude) - aspect.exact_angle).abs())
                .unwrap_or(f64::INFINITY)
        };

        let span = days_between(start, end).max(0.0);
        let count = (span / step_days).ceil().max(1.0) as usize;
        let spacing = span / count as f64;

        let mut best = (0.0, orb_at(0.0));
        for k in 1..=count {
            let offset = k as f64 * spacing;
            let orb = orb_at(offset);
            if orb < best.1 {
                best = (offset, orb);
            }
        }

        let mut lo = (best.0 - spacing).max(0.0);
        let mut hi = (best.0 + spacing).min(span);
        let mut x1 = hi - GOLDEN_RATIO_CONJUGATE * (hi - lo);
        let mut x2 = lo + GOLDEN_RATIO_CONJUGATE * (hi - lo);
        let mut f1 = orb_at(x1);
        let mut f2 = orb_at(x2);
        for _ in 0..config.max_iterations {
            if hi - lo <= config.precision_days {
                break;
            }
            if f1 <= f2 {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - GOLDEN_RATIO_CONJUGATE * (hi - lo);
                f1 = orb_at(x1);
            } else {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + GOLDEN_RATIO_CONJUGATE * (hi - lo);
                f2 = orb_at(x2);
            }
        }
        let refined = if f1 <= f2 { (x1, f1) } else { (x2, f2) };
        if refined.1 < best.1 {
            best = refined;
        }
        if !best.1.is_finite() {
            log::warn!("No usable {} sample inside {} window starting {}", body, aspect.kind, start);
        }

        (start + days(best.0), best.1)
    }
}

/// True while `kind` is the best match. Orbs wider than half the gap between
/// neighbouring aspects overlap, so being within orb of `kind` is not enough.
fn holds_aspect(natal_longitude: f64, kind: AspectKind, tolerance: f64) -> impl Fn(&Position) -> bool {
    move |p: &Position| match_aspect(p.longitude, natal_longitude, tolerance).map(|m| m.aspect.kind) == Some(kind)
}
