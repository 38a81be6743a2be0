pub mod capture;

pub use capture::{CameraError, OpenCvCamera, ThreadedCamera};
