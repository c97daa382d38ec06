use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ephemeris::time::datetime_to_julian_day;
use crate::ephemeris::types::{BodyState, CelestialBody, Position};
use crate::error::EphemerisError;
use crate::houses::HouseSystemKind;

/// Default step for the forward-difference speed estimate, in days.
pub const DEFAULT_VELOCITY_STEP_DAYS: f64 = 0.1;

/// A source of raw body states. Implementations must be deterministic.
pub trait EphemerisBackend {
    fn name(&self) -> &str;

    /// Apparent geocentric ecliptic longitude of date at `jd_ut`, plus the
    /// longitude speed when the backend computes it directly.
    fn state(&self, body: CelestialBody, jd_ut: f64) -> Result<BodyState, EphemerisError>;

    /// Instants the backend can answer for, when bounded.
    fn valid_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        None
    }

    /// House cusps (houses 1..12) computed by the backend itself. `None` means
    /// the backend has no house engine and the caller computes cusps.
    fn house_cusps(
        &self,
        _jd_ut: f64,
        _lat: f64,
        _lon: f64,
        _kind: HouseSystemKind,
    ) -> Option<Result<[f64; 12], EphemerisError>> {
        None
    }
}

impl<B: EphemerisBackend + ?Sized> EphemerisBackend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn state(&self, body: CelestialBody, jd_ut: f64) -> Result<BodyState, EphemerisError> {
        (**self).state(body, jd_ut)
    }

    fn valid_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        (**self).valid_range()
    }

    fn house_cusps(
        &self,
        jd_ut: f64,
        lat: f64,
        lon: f64,
        kind: HouseSystemKind,
    ) -> Option<Result<[f64; 12], EphemerisError>> {
        (**self).house_cusps(jd_ut, lat, lon, kind)
    }
}

/// The single contract everything above the ephemeris layer depends on.
pub trait PositionSource {
    fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError>;
}

impl<P: PositionSource + ?Sized> PositionSource for &P {
    fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        (**self).position_of(body, instant)
    }
}

impl<P: PositionSource + ?Sized> PositionSource for Arc<P> {
    fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        (**self).position_of(body, instant)
    }
}

/// Turns backend states into [`Position`]s, deriving speed when the backend
/// does not supply it.
#[derive(Debug, Clone)]
pub struct PositionProvider<B> {
    backend: B,
    velocity_step_days: f64,
}

impl<B: EphemerisBackend> PositionProvider<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            velocity_step_days: DEFAULT_VELOCITY_STEP_DAYS,
        }
    }

    pub fn with_velocity_step(mut self, days: f64) -> Self {
        if days.is_finite() && days > 0.0 {
            self.velocity_step_days = days;
        }
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn derived_speed(&self, body: CelestialBody, jd: f64, longitude: f64) -> f64 {
        let step = self.velocity_step_days;
        match self.backend.state(body, jd + step) {
            Ok(ahead) => {
                let mut delta = ahead.longitude - longitude;
                if delta > 180.0 {
                    delta -= 360.0;
                } else if delta < -180.0 {
                    delta += 360.0;
                }
                delta / step
            }
            Err(e) => {
                log::debug!(
                    "speed sample for {} failed ({}); using mean daily motion",
                    body,
                    e
                );
                body.mean_daily_motion()
            }
        }
    }
}

impl<B: EphemerisBackend> PositionSource for PositionProvider<B> {
    fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        let jd = datetime_to_julian_day(instant);
        let state = self.backend.state(body, jd)?;
        if !state.longitude.is_finite() {
            return Err(EphemerisError::Backend {
                body: body.to_string(),
                datetime: instant,
                message: format!("{} returned a non-finite longitude", self.backend.name()),
            });
        }
        let speed = match state.speed {
            Some(speed) if speed.is_finite() => speed,
            _ => self.derived_speed(body, jd, state.longitude),
        };
        Ok(Position::new(state.longitude, speed))
    }
}

/// Request-scoped memo over a [`PositionSource`]. Owned by one caller for
/// the duration of one request; never shared between workers.
pub struct MemoizedPositions<P> {
    inner: P,
    cache: RefCell<HashMap<(CelestialBody, i64), Position>>,
}

impl<P: PositionSource> MemoizedPositions<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

impl<P: PositionSource> PositionSource for MemoizedPositions<P> {
    fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        let key = (body, instant.timestamp_millis());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(*hit);
        }
        let position = self.inner.position_of(body, instant)?;
        self.cache.borrow_mut().insert(key, position);
        Ok(position)
    }
}

/// Fails every sample with [`EphemerisError::Cancelled`] once `flag` is set,
/// so a worker that nobody waits for anymore stops sampling.
pub struct CancellablePositions<P> {
    inner: P,
    flag: Arc<AtomicBool>,
}

impl<P: PositionSource> CancellablePositions<P> {
    pub fn new(inner: P, flag: Arc<AtomicBool>) -> Self {
        Self { inner, flag }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl<P: PositionSource> PositionSource for CancellablePositions<P> {
    fn position_of(&self, body: CelestialBody, instant: DateTime<Utc>) -> Result<Position, EphemerisError> {
        if self.is_cancelled() {
            return Err(EphemerisError::Cancelled);
        }
        self.inner.position_of(body, instant)
    }
}
