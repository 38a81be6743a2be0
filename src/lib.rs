pub mod camera;
pub mod catalog;
pub mod config;
pub mod overlay;
pub mod pose;
pub mod render;

pub use overlay::engine::{EngineState, FrameDecision, SessionState, TryOnEngine};
pub use overlay::garment::{Garment, GarmentCategory};
pub use overlay::placement::{PlacementCoefficients, Transform};
pub use pose::{Landmark, LandmarkIndex, LandmarkSet, PoseDetector};
