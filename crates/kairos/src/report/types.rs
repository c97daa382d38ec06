use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aspects::{AspectInstance, AspectSnapshot};
use crate::ephemeris::time::days_between;
use crate::ephemeris::{CelestialBody, Position};
use crate::search::{IngressEvent, RetrogradeInterval, SignWindow};

/// A stay of a transiting body in one natal house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseWindow {
    pub house: u8,
    pub entry: Option<DateTime<Utc>>,
    pub exit: Option<DateTime<Utc>>,
}

impl HouseWindow {
    pub fn duration_days(&self) -> Option<f64> {
        match (self.entry, self.exit) {
            (Some(entry), Some(exit)) => Some(days_between(entry, exit)),
            _ => None,
        }
    }
}

/// Everything computed for one transiting body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyReport {
    pub body: CelestialBody,
    pub position: Position,
    /// Natal house the body is transiting now
    pub house: u8,
    pub sign_window: SignWindow,
    pub ingresses: Vec<IngressEvent>,
    pub house_windows: Vec<HouseWindow>,
    pub retrogrades: Vec<RetrogradeInterval>,
    pub aspects: Vec<AspectInstance>,
    pub current_aspects: Vec<AspectSnapshot>,
}

/// Per-body result; one body failing never hides the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BodyOutcome {
    Complete(BodyReport),
    Failed { error: String },
}

impl BodyOutcome {
    pub fn report(&self) -> Option<&BodyReport> {
        match self {
            BodyOutcome::Complete(report) => Some(report),
            BodyOutcome::Failed { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, BodyOutcome::Complete(_))
    }
}
