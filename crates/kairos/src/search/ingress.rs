//! Sign ingresses: the instants a body crosses from one sign into the next,
//! in either direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ephemeris::time::days_between;
use crate::ephemeris::{CelestialBody, Position, PositionSource};
use crate::error::{TransitError, TransitResultExt};
use crate::search::transition::{SearchConfig, SearchDirection, TransitionFinder};
use crate::zodiac::ZodiacSign;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressEvent {
    pub body: CelestialBody,
    pub instant: DateTime<Utc>,
    pub from_sign: ZodiacSign,
    pub to_sign: ZodiacSign,
    /// True when the body falls back into the previous sign.
    pub retrograde: bool,
}

/// The sign a body occupies at some instant, with its entry and exit when
/// they lie within the search limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignWindow {
    pub sign: ZodiacSign,
    pub entered: Option<DateTime<Utc>>,
    pub exits: Option<DateTime<Utc>>,
}

pub struct IngressFinder<'a, P: ?Sized> {
    finder: TransitionFinder<'a, P>,
}

impl<'a, P: PositionSource + ?Sized> IngressFinder<'a, P> {
    pub fn new(source: &'a P, config: SearchConfig) -> Self {
        Self {
            finder: TransitionFinder::new(source, config),
        }
    }

    /// All ingresses of `body` in `(from, from + horizon_days]`, in order.
    pub fn find_ingresses(
        &self,
        body: CelestialBody,
        from: DateTime<Utc>,
        horizon_days: f64,
        step_days: f64,
    ) -> Result<Vec<IngressEvent>, TransitError> {
        let source = self.finder.source();
        let mut events = Vec::new();
        let mut t = from;
        let mut sign = source.position_of(body, from)?.sign();

        loop {
            let remaining = horizon_days - days_between(from, t);
            if remaining <= 0.0 {
                break;
            }
            let current = sign;
            let crossing = self
                .finder
                .find_transition(
                    body,
                    |p| p.sign() == current,
                    t,
                    SearchDirection::Forward,
                    remaining,
                    step_days,
                )
                .found()?;
            let Some(instant) = crossing else { break };
            if instant <= t {
                break;
            }

            let position = source.position_of(body, instant)?;
            let to_sign = position.sign();
            let retrograde = if to_sign == current.previous() {
                true
            } else if to_sign == current.next() {
                false
            } else {
                position.retrograde
            };
            events.push(IngressEvent {
                body,
                instant,
                from_sign: current,
                to_sign,
                retrograde,
            });
            t = instant;
            sign = to_sign;
        }

        Ok(events)
    }

    /// The sign occupied at `at`, with entry and exit searched up to
    /// `max_extension_days` either side.
    pub fn current_sign_window(
        &self,
        body: CelestialBody,
        at: DateTime<Utc>,
        step_days: f64,
    ) -> Result<SignWindow, TransitError> {
        let extension = self.finder.config().max_extension_days;
        let sign = self.finder.source().position_of(body, at)?.sign();
        let in_sign = |p: &Position| p.sign() == sign;

        let entered = self
            .finder
            .find_transition(body, in_sign, at, SearchDirection::Backward, extension, step_days)
            .found()?;
        let exits = self
            .finder
            .find_transition(body, in_sign, at, SearchDirection::Forward, extension, step_days)
            .found()?;

        Ok(SignWindow {
            sign,
            entered,
            exits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::time::days;
    use crate::error::EphemerisError;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    /// Moves forward 1°/day to day 40, then back 0.5°/day.
    struct Turning;

    impl PositionSource for Turning {
        fn position_of(&self, _body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
            let d = days_between(epoch(), instant);
            if d <= 40.0 {
                Ok(Position::new(5.0 + d, 1.0))
            } else {
                Ok(Position::new(45.0 - 0.5 * (d - 40.0), -0.5))
            }
        }
    }

    #[test]
    fn test_direct_then_retrograde_ingress() {
        let finder = IngressFinder::new(&Turning, SearchConfig::default());
        let events = finder
            .find_ingresses(CelestialBody::Saturn, epoch(), 100.0, 1.0)
            .unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].from_sign, ZodiacSign::Aries);
        assert_eq!(events[0].to_sign, ZodiacSign::Taurus);
        assert!(!events[0].retrograde);
        assert!(days_between(epoch() + days(25.0), events[0].instant).abs() < 1.0 / 1440.0);

        assert_eq!(events[1].from_sign, ZodiacSign::Taurus);
        assert_eq!(events[1].to_sign, ZodiacSign::Aries);
        assert!(events[1].retrograde);
        assert!(days_between(epoch() + days(70.0), events[1].instant).abs() < 1.0 / 1440.0);
    }

    #[test]
    fn test_sign_window_both_ends() {
        let finder = IngressFinder::new(&Turning, SearchConfig::default());
        let window = finder
            .current_sign_window(CelestialBody::Saturn, epoch() + days(30.0), 1.0)
            .unwrap();
        assert_eq!(window.sign, ZodiacSign::Taurus);
        let entered = window.entered.unwrap();
        let exits = window.exits.unwrap();
        assert!(days_between(epoch() + days(25.0), entered).abs() < 1.0 / 1440.0);
        assert!(days_between(epoch() + days(70.0), exits).abs() < 1.0 / 1440.0);
    }

    #[test]
    fn test_no_ingress_inside_short_horizon() {
        let finder = IngressFinder::new(&Turning, SearchConfig::default());
        let events = finder
            .find_ingresses(CelestialBody::Saturn, epoch(), 10.0, 1.0)
            .unwrap();
        assert!(events.is_empty());
    }
}
