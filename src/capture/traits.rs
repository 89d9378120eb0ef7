//! Traits for camera capture functionality

use async_trait::async_trait;

use super::{CaptureConstraints, CaptureError};
use crate::pipeline::types::VideoFrame;

/// A source of camera streams
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Whether this backend can capture at all on the current host
    fn is_supported(&self) -> bool {
        true
    }

    /// Open a stream satisfying `constraints`
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn VideoStream>, CaptureError>;
}

/// A live stream handed out by a [`CaptureDevice`]
#[async_trait]
pub trait VideoStream: Send + Sync {
    /// Most recent frame, `None` before the first one arrives
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Resolve once the stream has produced its first frame
    async fn wait_playable(&mut self) -> Result<(), CaptureError>;

    /// Stop every underlying track. Must be idempotent.
    fn stop(&mut self);

    /// Whether the stream is still delivering frames
    fn is_live(&self) -> bool;
}
