//! Apparent retrograde motion: intervals during which a body's longitude
//! speed is negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ephemeris::time::{days, days_between};
use crate::ephemeris::{CelestialBody, Position, PositionSource};
use crate::error::{EphemerisError, TransitError, TransitResultExt};
use crate::houses::HouseSystem;
use crate::search::transition::{SearchConfig, SearchDirection, TransitionFinder};
use crate::zodiac::ZodiacSign;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrogradeInterval {
    pub body: CelestialBody,
    /// Station retrograde
    pub start: DateTime<Utc>,
    /// Station direct
    pub end: DateTime<Utc>,
    /// Sign the body stands in when it turns direct
    pub destination_sign: ZodiacSign,
    pub destination_house: Option<u8>,
}

impl RetrogradeInterval {
    pub fn duration_days(&self) -> f64 {
        days_between(self.start, self.end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn is_retrograde(position: &Position) -> bool {
    position.speed < 0.0
}

pub struct RetrogradeDetector<'a, P: ?Sized> {
    finder: TransitionFinder<'a, P>,
}

impl<'a, P: PositionSource + ?Sized> RetrogradeDetector<'a, P> {
    pub fn new(source: &'a P, config: SearchConfig) -> Self {
        Self {
            finder: TransitionFinder::new(source, config),
        }
    }

    /// Every retrograde interval overlapping `[from, from + horizon_days]`.
    ///
    /// Intervals already under way at `from` or still open at the horizon
    /// have their stations searched outside the window, up to
    /// `max_extension_days`.
    pub fn find_retrograde_intervals(
        &self,
        body: CelestialBody,
        from: DateTime<Utc>,
        horizon_days: f64,
        step_days: f64,
        houses: Option<&HouseSystem>,
    ) -> Result<Vec<RetrogradeInterval>, TransitError> {
        let shortest = body
            .shortest_retrograde_days()
            .ok_or_else(|| TransitError::UnsupportedBody {
                body,
                reason: "never retrogrades as seen from Earth".to_string(),
            })?;
        if !step_days.is_finite() || step_days <= 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("retrograde step must be positive, got {}", step_days),
            });
        }
        if !horizon_days.is_finite() || horizon_days < 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("horizon must be non-negative, got {}", horizon_days),
            });
        }

        let max_step = shortest / 4.0;
        let step = if step_days > max_step {
            log::debug!(
                "Clamping {} retrograde step from {} to {} days",
                body,
                step_days,
                max_step
            );
            max_step
        } else {
            step_days
        };

        let source = self.finder.source();
        let extension = self.finder.config().max_extension_days;
        let mut intervals = Vec::new();

        let first = source.position_of(body, from)?;
        let mut open = if is_retrograde(&first) {
            self.finder
                .find_transition(body, is_retrograde, from, SearchDirection::Backward, extension, step)
                .found()?
        } else {
            None
        };
        if is_retrograde(&first) && open.is_none() {
            log::warn!(
                "{} is retrograde at {} but its station lies beyond {} days; dropping interval",
                body,
                from,
                extension
            );
        }
        let mut in_retrograde = is_retrograde(&first);
        let mut t_prev = from;
        let mut last = first;
        let mut elapsed = 0.0;

        while elapsed < horizon_days {
            elapsed = (elapsed + step).min(horizon_days);
            let t = from + days(elapsed);
            let position = match source.position_of(body, t) {
                Ok(p) => p,
                Err(EphemerisError::Cancelled) => return Err(EphemerisError::Cancelled.into()),
                Err(e) => {
                    log::warn!("Skipping {} sample at {}: {}", body, t, e);
                    continue;
                }
            };

            let now_retrograde = is_retrograde(&position);
            if now_retrograde && !in_retrograde {
                open = Some(self.finder.refine(body, &is_retrograde, t_prev, t));
            } else if !now_retrograde && in_retrograde {
                let end = self.finder.refine(body, &is_retrograde, t_prev, t);
                if let Some(start) = open.take() {
                    intervals.push(self.close(body, start, end, &position, houses));
                }
            }
            in_retrograde = now_retrograde;
            t_prev = t;
            last = position;
        }

        if in_retrograde {
            if let Some(start) = open {
                match self
                    .finder
                    .find_transition(body, is_retrograde, t_prev, SearchDirection::Forward, extension, step)
                    .found()
                {
                    Ok(Some(end)) => intervals.push(self.close(body, start, end, &last, houses)),
                    Ok(None) => log::info!(
                        "{} still retrograde {} days past the horizon; dropping interval",
                        body,
                        extension
                    ),
                    Err(e) => log::warn!("Cannot close {} retrograde interval: {}", body, e),
                }
            }
        }

        Ok(intervals)
    }

    fn close(
        &self,
        body: CelestialBody,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        fallback: &Position,
        houses: Option<&HouseSystem>,
    ) -> RetrogradeInterval {
        let at_station = self
            .finder
            .source()
            .position_of(body, end)
            .unwrap_or(*fallback);
        RetrogradeInterval {
            body,
            start,
            end,
            destination_sign: at_station.sign(),
            destination_house: houses.map(|h| h.house_of(at_station.longitude)),
        }
    }
}
