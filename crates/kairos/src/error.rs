use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ephemeris::CelestialBody;

/// Errors raised by an ephemeris backend or the position provider wrapping it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("Instant {datetime} is outside the valid range of the {backend} ephemeris ({valid})")]
    OutOfRange {
        backend: String,
        datetime: DateTime<Utc>,
        valid: String,
    },
    #[error("Body {body} is not supported by the {backend} ephemeris")]
    UnsupportedBody { body: String, backend: String },
    #[error("Failed to calculate position for {body} at {datetime}: {message}")]
    Backend {
        body: String,
        datetime: DateTime<Utc>,
        message: String,
    },
    #[error("Ephemeris file not found at path: {path}. {message}")]
    FileNotFound { path: String, message: String },
    #[error("House calculation failed: {message}")]
    HouseCalculationFailed { message: String },
    #[error("Computation cancelled")]
    Cancelled,
}

/// Errors surfaced by the search and report layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitError {
    #[error("Unsupported body {body}: {reason}")]
    UnsupportedBody { body: CelestialBody, reason: String },
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
    #[error("House system {system} is undefined at latitude {latitude:.2} (limit ±{limit:.1})")]
    GeodeticRange {
        system: String,
        latitude: f64,
        limit: f64,
    },
    #[error("No transition within {horizon_days} days")]
    NotFound { horizon_days: f64 },
    #[error("Invalid house cusps: {message}")]
    InvalidCusps { message: String },
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl TransitError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransitError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransitError::Ephemeris(EphemerisError::Cancelled))
    }
}

/// Turns `NotFound` into an empty result; any other error still propagates.
pub trait TransitResultExt<T> {
    fn found(self) -> Result<Option<T>, TransitError>;
}

impl<T> TransitResultExt<T> for Result<T, TransitError> {
    fn found(self) -> Result<Option<T>, TransitError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(TransitError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
