//! Hand tracker coordinator
//!
//! Wires acquisition → scheduler → detector → classifier → stabilizer →
//! publisher and manages their lifecycle. At most one capture session is
//! live at any time.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{
    CameraAcquisition, CaptureDevice, CaptureStatus, StatusReporter,
};
use crate::config::TrackerConfig;
use crate::inference::{DetectorFactory, InitializationError, LandmarkDetector};
use crate::pipeline::clock::PipelineClock;
use crate::pipeline::health::{HealthMonitor, PipelineHealth};
use crate::pipeline::publisher::{HandData, HandDataPublisher};
use crate::pipeline::scheduler::FrameScheduler;

type SharedDetector = Arc<Mutex<Box<dyn LandmarkDetector>>>;

/// Coordinates the tracking pipeline
///
/// `start()` and `stop()` toggle the enable flag. Each start after a stop or
/// a capture error acquires the camera from scratch.
pub struct HandTracker {
    config: TrackerConfig,
    device: Arc<dyn CaptureDevice>,
    factory: Arc<dyn DetectorFactory>,
    detector: Option<SharedDetector>,
    clock: PipelineClock,
    health: Arc<PipelineHealth>,
    status: StatusReporter,
    publisher: HandDataPublisher,

    // Enable flag of the current session
    session_cancel: Option<CancellationToken>,
    supervisor: Option<JoinHandle<()>>,
}

impl HandTracker {
    /// Create a new tracker. Call [`HandTracker::init`] before starting it.
    pub fn new(
        config: TrackerConfig,
        device: Arc<dyn CaptureDevice>,
        factory: Arc<dyn DetectorFactory>,
    ) -> Self {
        Self {
            config,
            device,
            factory,
            detector: None,
            clock: PipelineClock::new(),
            health: Arc::new(PipelineHealth::new()),
            status: StatusReporter::new(),
            publisher: HandDataPublisher::new(),
            session_cancel: None,
            supervisor: None,
        }
    }

    /// Load the landmark engine.
    ///
    /// Failure is fatal: it is reported once through the status handler and
    /// every later `start()` is refused.
    pub async fn init(&mut self) -> Result<(), InitializationError> {
        if self.detector.is_some() {
            return Ok(());
        }

        info!(
            "Loading hand landmark engine ({} hand, detection confidence {})",
            self.config.detector.num_hands, self.config.detector.min_hand_detection_confidence
        );

        match self.factory.init(&self.config.detector).await {
            Ok(detector) => {
                self.detector = Some(Arc::new(Mutex::new(detector)));
                info!("Hand landmark engine ready");
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize hand landmark engine: {}", e);
                self.status.set(CaptureStatus::Error, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Register the per-frame consumer
    pub fn on_hand_data<F>(&self, handler: F)
    where
        F: Fn(HandData) + Send + Sync + 'static,
    {
        self.publisher.on_hand_data(Arc::new(handler));
    }

    /// Register the status consumer
    pub fn on_status_change<F>(&self, handler: F)
    where
        F: Fn(CaptureStatus, Option<&str>) + Send + Sync + 'static,
    {
        self.status.set_handler(Arc::new(handler));
    }

    /// Raise the enable flag and start a capture session if none is running.
    pub fn start(&mut self) -> Result<(), InitializationError> {
        let detector = self
            .detector
            .clone()
            .ok_or(InitializationError::NotInitialized)?;

        if self.is_running() {
            debug!("Hand tracker already running");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        self.session_cancel = Some(cancel.clone());

        let previous = self.supervisor.take();
        let session = Session {
            acquisition: CameraAcquisition::new(
                self.device.clone(),
                self.config.capture.tiers.clone(),
                self.config.playable_timeout(),
                self.status.clone(),
            ),
            detector,
            config: self.config.clone(),
            clock: self.clock.clone(),
            health: self.health.clone(),
            publisher: self.publisher.clone(),
            cancel,
        };

        self.supervisor = Some(tokio::spawn(async move {
            // Only one session may hold the camera
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    error!("Previous tracking session failed: {}", e);
                }
            }
            session.run().await;
        }));

        info!("Hand tracker started");
        Ok(())
    }

    /// Lower the enable flag. The session stops on its next tick and
    /// releases the camera.
    pub fn stop(&mut self) {
        if let Some(cancel) = &self.session_cancel {
            if !cancel.is_cancelled() {
                cancel.cancel();
                info!("Hand tracker stopping");
            }
        }
    }

    /// Stop, wait for the session to wind down and close the engine
    pub async fn shutdown(&mut self) {
        self.stop();

        if let Some(handle) = self.supervisor.take() {
            if let Err(e) = handle.await {
                error!("Tracking session failed: {}", e);
            }
        }

        if let Some(detector) = self.detector.take() {
            detector.lock().await.close();
        }

        info!("Hand tracker shut down. {}", self.health.summary());
    }

    /// Whether a session is live or being set up
    pub fn is_running(&self) -> bool {
        let enabled = self
            .session_cancel
            .as_ref()
            .is_some_and(|c| !c.is_cancelled());
        let alive = self.supervisor.as_ref().is_some_and(|h| !h.is_finished());
        enabled && alive
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.get()
    }

    /// Message attached to the current status (set on errors)
    pub fn status_message(&self) -> Option<String> {
        self.status.message()
    }

    pub fn latest_hand_data(&self) -> HandData {
        self.publisher.latest()
    }

    pub fn subscribe_hand_data(&self) -> watch::Receiver<HandData> {
        self.publisher.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<CaptureStatus> {
        self.status.subscribe()
    }

    pub fn health(&self) -> &Arc<PipelineHealth> {
        &self.health
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl Drop for HandTracker {
    fn drop(&mut self) {
        if let Some(cancel) = self.session_cancel.take() {
            cancel.cancel();
        }
    }
}

/// Everything one capture session needs, moved into its supervisor task
struct Session {
    acquisition: CameraAcquisition,
    detector: SharedDetector,
    config: TrackerConfig,
    clock: PipelineClock,
    health: Arc<PipelineHealth>,
    publisher: HandDataPublisher,
    cancel: CancellationToken,
}

impl Session {
    async fn run(mut self) {
        if self.cancel.is_cancelled() {
            return;
        }

        if let Err(e) = self.acquisition.acquire().await {
            warn!("Camera acquisition failed: {} [{}]", e, e.detail());
            return;
        }

        // Stopped while the camera was being opened
        if self.cancel.is_cancelled() {
            self.acquisition.release();
            return;
        }

        let mut detector = self.detector.lock().await;
        self.health.touch();

        let monitor_cancel = self.cancel.child_token();
        let (alert_tx, mut alert_rx) = mpsc::channel(16);
        let monitor = HealthMonitor::new(self.health.clone(), alert_tx)
            .with_check_interval(self.config.health.check_interval())
            .with_stall_threshold(self.config.health.stall_threshold())
            .with_summary_interval(self.config.health.summary_interval());
        {
            let monitor_cancel = monitor_cancel.clone();
            tokio::spawn(async move { monitor.run_until(monitor_cancel).await });
        }
        tokio::spawn(async move {
            while let Some(alert) = alert_rx.recv().await {
                warn!("Hand tracker health: {}", alert);
            }
        });

        let mut scheduler = FrameScheduler::new(
            self.clock.clone(),
            self.publisher.clone(),
            self.health.clone(),
            self.cancel.clone(),
            self.config.tick_interval(),
        );
        scheduler.run(&self.acquisition, &mut **detector).await;

        monitor_cancel.cancel();
        drop(detector);
        self.acquisition.release();
        info!("Tracking session ended");
    }
}
