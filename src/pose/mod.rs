pub mod detector;
pub mod landmark;
pub mod preprocess;

pub use detector::PoseDetector;
pub use landmark::{Landmark, LandmarkIndex, LandmarkSet};
pub use preprocess::{preprocess_for_blazepose, BLAZEPOSE_INPUT_SIZE};
