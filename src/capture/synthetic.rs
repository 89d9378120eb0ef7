//! Synthetic camera backend
//!
//! Produces frames on a fixed cadence without touching hardware. Used by the
//! `handcast` binary together with a replayed landmark recording, and by
//! tests that need a real frame source.

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{CaptureConstraints, CaptureDevice, CaptureError, FacingMode, VideoStream};
use crate::pipeline::types::{Timestamp, VideoFrame};

/// Failure the synthetic device should simulate on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticFault {
    PermissionDenied,
    Busy,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticCameraConfig {
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Number of zero-area frames emitted before real frames
    pub warmup_frames: u64,
    pub fault: Option<SyntheticFault>,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            width: 640,
            height: 480,
            fps: 30,
            warmup_frames: 3,
            fault: None,
        }
    }
}

impl SyntheticCameraConfig {
    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    /// RGB8 payload size of one frame
    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyntheticCameraConfig {
        &self.config
    }
}

#[async_trait]
impl CaptureDevice for SyntheticCamera {
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn VideoStream>, CaptureError> {
        match self.config.fault {
            Some(SyntheticFault::PermissionDenied) => {
                return Err(CaptureError::PermissionDenied(
                    "synthetic permission denial".into(),
                ));
            }
            Some(SyntheticFault::Busy) => {
                return Err(CaptureError::DeviceBusy("synthetic device busy".into()));
            }
            Some(SyntheticFault::Missing) => {
                return Err(CaptureError::NotFound("synthetic device missing".into()));
            }
            None => {}
        }

        if let Some(facing) = constraints.facing {
            if facing != self.config.facing {
                return Err(CaptureError::NotFound(format!(
                    "no {facing}-facing camera (device faces {})",
                    self.config.facing
                )));
            }
        }

        Ok(Box::new(SyntheticStream::start(self.config.clone())))
    }
}

/// Stream fed by a background frame generator task
pub struct SyntheticStream {
    frames: watch::Receiver<Option<VideoFrame>>,
    cancel: CancellationToken,
}

impl SyntheticStream {
    fn start(config: SyntheticCameraConfig) -> Self {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!(
            "Synthetic camera started: {}x{} @ {} fps ({} warm-up frames)",
            config.width, config.height, config.fps, config.warmup_frames
        );

        tokio::spawn(async move {
            let interval = config.frame_interval();
            let payload = Bytes::from(vec![0u8; config.frame_bytes()]);
            let mut ticker = tokio::time::interval(interval);
            let mut sequence: u64 = 0;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let timestamp =
                    Timestamp::from_micros(interval.as_micros() as i64 * sequence as i64);
                let frame = if sequence < config.warmup_frames {
                    VideoFrame::empty(timestamp, sequence)
                } else {
                    VideoFrame::new(
                        payload.clone(),
                        config.width,
                        config.height,
                        timestamp,
                        sequence,
                    )
                };

                if tx.send(Some(frame)).is_err() {
                    break;
                }
                sequence += 1;
            }

            debug!("Synthetic camera stopped after {sequence} frames");
        });

        Self { frames: rx, cancel }
    }
}

#[async_trait]
impl VideoStream for SyntheticStream {
    fn current_frame(&self) -> Option<VideoFrame> {
        self.frames.borrow().clone()
    }

    async fn wait_playable(&mut self) -> Result<(), CaptureError> {
        self.frames
            .wait_for(Option::is_some)
            .await
            .map(|_| ())
            .map_err(|_| CaptureError::Unknown("stream ended before first frame".into()))
    }

    fn stop(&mut self) {
        self.cancel.cancel();
    }

    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
