pub mod cusps;
pub mod system;
pub mod types;

pub use cusps::{compute_cusps, QUADRANT_LATITUDE_LIMIT};
pub use system::HouseSystem;
pub use types::{HouseCusp, HouseSystemKind};
