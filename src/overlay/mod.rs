pub mod engine;
pub mod garment;
pub mod geometry;
pub mod placement;
pub mod smooth;

pub use engine::{EngineState, FrameDecision, FrameThrottle, SessionState, TryOnEngine};
pub use garment::{Garment, GarmentCategory, SelectedProduct};
pub use geometry::PixelPoint;
pub use placement::{compute_transform, PlacementCoefficients, Transform};
pub use smooth::PointSmoother;
