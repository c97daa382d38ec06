pub mod ingress;
pub mod retrograde;
pub mod transition;

pub use ingress::{IngressEvent, IngressFinder, SignWindow};
pub use retrograde::{RetrogradeDetector, RetrogradeInterval};
pub use transition::{SearchConfig, SearchDirection, TransitionFinder};
