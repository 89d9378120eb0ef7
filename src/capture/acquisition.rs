//! Tiered camera acquisition

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    CaptureConstraints, CaptureDevice, CaptureError, CaptureStatus, StatusReporter, VideoStream,
};
use crate::pipeline::types::VideoFrame;

/// An open, playing camera stream
pub struct CaptureSession {
    stream: Box<dyn VideoStream>,
    tier: usize,
    constraints: CaptureConstraints,
    started_at: Instant,
}

impl CaptureSession {
    /// Latest frame from the device
    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.stream.current_frame()
    }

    /// Index of the constraint tier that opened this session
    pub fn tier(&self) -> usize {
        self.tier
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_live()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn stop(&mut self) {
        self.stream.stop();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("tier", &self.tier)
            .field("constraints", &self.constraints)
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

/// Owns the camera for one tracker.
///
/// At most one [`CaptureSession`] is held at a time; acquiring again releases
/// the previous one first.
pub struct CameraAcquisition {
    device: Arc<dyn CaptureDevice>,
    tiers: Vec<CaptureConstraints>,
    playable_timeout: Duration,
    status: StatusReporter,
    session: Option<CaptureSession>,
}

impl CameraAcquisition {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        tiers: Vec<CaptureConstraints>,
        playable_timeout: Duration,
        status: StatusReporter,
    ) -> Self {
        Self {
            device,
            tiers,
            playable_timeout,
            status,
            session: None,
        }
    }

    /// Try every constraint tier in order and start the first stream that opens.
    ///
    /// On total failure the error of the last tier is returned and reported
    /// through the status handler.
    pub async fn acquire(&mut self) -> Result<&CaptureSession, CaptureError> {
        self.release();

        if !self.device.is_supported() {
            return Err(self.fail(CaptureError::Unknown(
                "capture backend not supported".to_string(),
            )));
        }

        if self.tiers.is_empty() {
            return Err(self.fail(CaptureError::NotFound(
                "no constraint tiers configured".to_string(),
            )));
        }

        self.status.set(CaptureStatus::Requesting, None);

        let mut last_error = None;
        for (index, constraints) in self.tiers.iter().enumerate() {
            debug!("Requesting camera with {constraints} (tier {index})");

            let mut stream = match self.device.request_stream(constraints).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Camera tier {index} ({constraints}) failed: {e} [{}]", e.detail());
                    last_error = Some(e);
                    continue;
                }
            };

            match tokio::time::timeout(self.playable_timeout, stream.wait_playable()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    stream.stop();
                    return Err(self.fail(e));
                }
                Err(_) => {
                    stream.stop();
                    return Err(self.fail(CaptureError::Unknown(
                        "unable to start video playback".to_string(),
                    )));
                }
            }

            info!("Camera started with {constraints} (tier {index})");
            let session = CaptureSession {
                stream,
                tier: index,
                constraints: constraints.clone(),
                started_at: Instant::now(),
            };
            self.status.set(CaptureStatus::Active, None);
            return Ok(&*self.session.insert(session));
        }

        let err = last_error
            .unwrap_or_else(|| CaptureError::NotFound("no constraint tier succeeded".to_string()));
        error!("All {} camera tiers failed", self.tiers.len());
        Err(self.fail(err))
    }

    /// Stop every track of the current session. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            info!("Camera released after {:?}", session.uptime());
            self.status.set(CaptureStatus::Idle, None);
        }
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.get()
    }

    pub fn tiers(&self) -> &[CaptureConstraints] {
        &self.tiers
    }

    fn fail(&self, err: CaptureError) -> CaptureError {
        self.status.set(CaptureStatus::Error, Some(err.to_string()));
        err
    }
}

impl Drop for CameraAcquisition {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }
}
