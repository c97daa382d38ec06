pub mod aspects;
pub mod chart;
pub mod ephemeris;
pub mod error;
pub mod houses;
pub mod report;
pub mod search;
pub mod zodiac;

pub use aspects::{AspectInstance, AspectKind, AspectMatcher, AspectWindowFinder, OrbPolicy};
pub use chart::{NatalChart, NatalChartBuilder};
pub use ephemeris::{
    AnalyticEphemeris, CancellablePositions, CelestialBody, EphemerisBackend, GeoLocation, MemoizedPositions, Position,
    PositionProvider, PositionSource,
};
pub use error::{EphemerisError, TransitError, TransitResultExt};
pub use houses::{HouseSystem, HouseSystemKind};
pub use report::{BodyOutcome, BodyReport, ReportConfig, ReportRunner, RunnerLimits, TransitReport};
pub use search::{
    IngressFinder, RetrogradeDetector, RetrogradeInterval, SearchConfig, SearchDirection,
    TransitionFinder,
};
pub use zodiac::ZodiacSign;

#[cfg(feature = "swisseph")]
pub use ephemeris::SwissEphemerisAdapter;
