#[cfg(feature = "swisseph")]
pub mod adapter;
pub mod analytic;
pub mod provider;
pub mod time;
pub mod types;

#[cfg(feature = "swisseph")]
pub use adapter::SwissEphemerisAdapter;
pub use analytic::AnalyticEphemeris;
pub use provider::{
    CancellablePositions, EphemerisBackend, MemoizedPositions, PositionProvider, PositionSource,
    DEFAULT_VELOCITY_STEP_DAYS,
};
pub use types::{BodyCategory, BodyState, CelestialBody, GeoLocation, Position};
