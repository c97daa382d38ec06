pub mod calculator;
pub mod types;
pub mod windows;

pub use calculator::{angular_separation, is_applying, match_aspect, AspectMatcher};
pub use types::{
    Aspect, AspectInstance, AspectKind, AspectMatch, AspectNature, AspectSnapshot, OrbPolicy,
    ASPECTS,
};
pub use windows::AspectWindowFinder;
