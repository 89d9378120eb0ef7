//! Hand gesture tracking pipeline
//!
//! Turns a live stream of hand-landmark detections into a debounced gesture
//! signal plus a mirrored pointer location:
//!
//! ```text
//! Camera → FrameScheduler → LandmarkDetector → classify → stabilize → publish
//! ```
//!
//! The landmark engine and the capture hardware sit behind the
//! [`inference::LandmarkDetector`] and [`capture::CaptureDevice`] traits.
//! [`pipeline::HandTracker`] wires everything together.

pub mod capture;
pub mod config;
pub mod gesture;
pub mod inference;
pub mod pipeline;

pub use capture::{CaptureError, CaptureStatus};
pub use config::TrackerConfig;
pub use gesture::{Gesture, HandLandmarkSet, Landmark};
pub use inference::{DetectorFactory, InitializationError, LandmarkDetector};
pub use pipeline::{HandData, HandTracker};
