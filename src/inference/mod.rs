//! Landmark inference seam
//!
//! The tracker never runs a model itself. It talks to a [`LandmarkDetector`]
//! created once by a [`DetectorFactory`], and feeds it one frame per tick.

pub mod replay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gesture::HandLandmarkSet;
use crate::pipeline::types::VideoFrame;

pub use replay::{ReplayDetector, ReplayDetectorFactory};

/// Options handed to the landmark engine at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    pub num_hands: u32,
    pub min_hand_detection_confidence: f32,
    pub min_hand_presence_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            num_hands: 1,
            min_hand_detection_confidence: 0.5,
            min_hand_presence_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// The landmark engine could not be loaded. Fatal for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    #[error("failed to load hand landmark model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },
    #[error("unsupported detector options: {0}")]
    UnsupportedOptions(String),
    #[error("hand landmark service is not initialized")]
    NotInitialized,
}

/// Builds the detector. Called once per tracker.
#[async_trait]
pub trait DetectorFactory: Send + Sync {
    async fn init(
        &self,
        options: &DetectorOptions,
    ) -> Result<Box<dyn LandmarkDetector>, InitializationError>;
}

/// A loaded landmark engine in video mode.
///
/// Calls are strictly sequential and `timestamp_ms` is strictly increasing.
#[async_trait]
pub trait LandmarkDetector: Send {
    /// Landmarks of the first detected hand, `None` when no hand is visible
    async fn detect(
        &mut self,
        frame: &VideoFrame,
        timestamp_ms: f64,
    ) -> anyhow::Result<Option<HandLandmarkSet>>;

    /// Release model resources
    fn close(&mut self) {}
}
