//! Per-body transit reports against a natal chart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aspects::{AspectMatcher, AspectWindowFinder, OrbPolicy};
use crate::chart::NatalChart;
use crate::ephemeris::time::{days, days_between};
use crate::ephemeris::{CelestialBody, MemoizedPositions, PositionSource};
use crate::error::{TransitError, TransitResultExt};
use crate::report::types::{BodyOutcome, BodyReport, HouseWindow};
use crate::search::{IngressFinder, RetrogradeDetector, SearchConfig, SearchDirection, TransitionFinder};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub search: SearchConfig,
    pub orbs: OrbPolicy,
}

pub struct TransitReport<'a, P: ?Sized> {
    source: &'a P,
    natal: &'a NatalChart,
    config: ReportConfig,
}

impl<'a, P: PositionSource + ?Sized> TransitReport<'a, P> {
    pub fn new(source: &'a P, natal: &'a NatalChart, config: ReportConfig) -> Self {
        Self {
            source,
            natal,
            config,
        }
    }

    /// Reports for every body in `bodies`. Never fails as a whole.
    pub fn build_report(
        &self,
        bodies: &[CelestialBody],
        now: DateTime<Utc>,
        horizon_days: f64,
    ) -> BTreeMap<CelestialBody, BodyOutcome> {
        log::info!(
            "Building transit report for {} bodies from {} over {} days",
            bodies.len(),
            now,
            horizon_days
        );
        bodies
            .iter()
            .map(|&body| (body, self.body_outcome(body, now, horizon_days)))
            .collect()
    }

    pub fn body_outcome(&self, body: CelestialBody, now: DateTime<Utc>, horizon_days: f64) -> BodyOutcome {
        match self.body_report(body, now, horizon_days) {
            Ok(report) => BodyOutcome::Complete(report),
            Err(e) => {
                log::warn!("Transit report for {} failed: {}", body, e);
                BodyOutcome::Failed { error: e.to_string() }
            }
        }
    }

    /// Report for a single body, memoizing positions for the duration of the call.
    pub fn body_report(
        &self,
        body: CelestialBody,
        now: DateTime<Utc>,
        horizon_days: f64,
    ) -> Result<BodyReport, TransitError> {
        if !horizon_days.is_finite() || horizon_days < 0.0 {
            return Err(TransitError::InvalidInput {
                message: format!("horizon must be non-negative, got {}", horizon_days),
            });
        }
        self.config.search.validate()?;

        let memo = MemoizedPositions::new(self.source);
        let report = self.compute(&memo, body, now, horizon_days)?;
        log::debug!("{} report used {} distinct samples", body, memo.len());
        Ok(report)
    }

    fn compute<S: PositionSource + ?Sized>(
        &self,
        source: &S,
        body: CelestialBody,
        now: DateTime<Utc>,
        horizon_days: f64,
    ) -> Result<BodyReport, TransitError> {
        let search = self.config.search;
        let position = source.position_of(body, now)?;
        let house = self.natal.house_of(position.longitude);

        let ingress = IngressFinder::new(source, search);
        let sign_window = ingress.current_sign_window(body, now, search.coarse_step_days)?;
        let ingresses = ingress.find_ingresses(body, now, horizon_days, search.coarse_step_days)?;

        let horizon_end = now + days(horizon_days);
        let limit = match sign_window.exits {
            Some(exit) if exit < horizon_end => exit,
            _ => horizon_end,
        };
        let house_windows = self.house_windows(source, body, house, now, limit, horizon_end)?;

        let retrogrades = if body.can_retrograde() {
            RetrogradeDetector::new(source, search).find_retrograde_intervals(
                body,
                now,
                horizon_days,
                search.retrograde_step_days,
                Some(&self.natal.houses),
            )?
        } else {
            Vec::new()
        };

        let matcher = AspectMatcher::new(self.config.orbs);
        let windows = AspectWindowFinder::new(source, search);
        let mut aspects = Vec::new();
        let mut current_aspects = Vec::new();
        for (&natal_body, natal_position) in &self.natal.positions {
            aspects.extend(windows.find_aspect_windows(
                body,
                natal_body,
                natal_position.longitude,
                matcher.tolerance(body, natal_body),
                now,
                horizon_days,
                search.aspect_step_days,
            )?);
            if let Some(snapshot) = matcher.snapshot(body, &position, natal_body, natal_position) {
                current_aspects.push(snapshot);
            }
        }
        aspects.sort_by(|a, b| {
            a.window_start
                .cmp(&b.window_start)
                .then(a.natal_body.cmp(&b.natal_body))
        });

        Ok(BodyReport {
            body,
            position,
            house,
            sign_window,
            ingresses,
            house_windows,
            retrogrades,
            aspects,
            current_aspects,
        })
    }

    /// Consecutive natal-house stays starting with the current one. New
    /// windows open only before `limit`; exits are searched to `horizon_end`.
    fn house_windows<S: PositionSource + ?Sized>(
        &self,
        source: &S,
        body: CelestialBody,
        current_house: u8,
        now: DateTime<Utc>,
        limit: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<Vec<HouseWindow>, TransitError> {
        let search = self.config.search;
        let finder = TransitionFinder::new(source, search);
        let houses = &self.natal.houses;

        let first_house = current_house;
        let mut entry = finder
            .find_transition(
                body,
                |p| houses.house_of(p.longitude) == first_house,
                now,
                SearchDirection::Backward,
                search.max_extension_days,
                search.coarse_step_days,
            )
            .found()?;

        let mut windows = Vec::new();
        let mut house = current_house;
        let mut t = now;
        loop {
            let remaining = days_between(t, horizon_end);
            let exit = if remaining > 0.0 {
                let in_house = house;
                finder
                    .find_transition(
                        body,
                        |p| houses.house_of(p.longitude) == in_house,
                        t,
                        SearchDirection::Forward,
                        remaining,
                        search.coarse_step_days,
                    )
                    .found()?
            } else {
                None
            };
            windows.push(HouseWindow { house, entry, exit });

            match exit {
                Some(x) if x < limit && x > t => {
                    house = houses.house_of(source.position_of(body, x)?.longitude);
                    entry = Some(x);
                    t = x;
                }
                _ => break,
            }
        }
        Ok(windows)
    }
}
