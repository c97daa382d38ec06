pub mod builder;
pub mod runner;
pub mod types;

pub use builder::{ReportConfig, TransitReport};
pub use runner::{ReportRunner, RunnerLimits};
pub use types::{BodyOutcome, BodyReport, HouseWindow};
