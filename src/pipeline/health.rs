//! Health monitoring and metrics for the tracking pipeline

use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn unix_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Health metrics for a pipeline
///
/// Tracks counters and timestamps to monitor pipeline health.
/// All fields use atomic operations for thread-safe access.
pub struct PipelineHealth {
    /// Scheduler ticks that reached the frame check
    pub ticks: AtomicU64,

    /// Frames handed to the detector and published
    pub frames_processed: AtomicU64,

    /// Ticks skipped because the video had not advanced
    pub stale_frames: AtomicU64,

    /// Ticks skipped because the device was still warming up
    pub warmup_frames: AtomicU64,

    /// Number of detector calls
    pub inference_calls: AtomicU64,

    /// Number of detector calls that returned an error
    pub inference_failures: AtomicU64,

    /// Processed frames where a hand was found
    pub hands_detected: AtomicU64,

    /// Timestamp (as Unix microseconds) of the last processed frame
    pub last_frame_time: AtomicU64,
}

impl PipelineHealth {
    /// Create a new health metrics instance
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            frames_processed: AtomicU64::new(0),
            stale_frames: AtomicU64::new(0),
            warmup_frames: AtomicU64::new(0),
            inference_calls: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            hands_detected: AtomicU64::new(0),
            last_frame_time: AtomicU64::new(unix_micros()),
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_frame(&self) {
        self.stale_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warmup_frame(&self) {
        self.warmup_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference_call(&self) {
        self.inference_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed detector call, returning the new failure total
    pub fn record_inference_failure(&self) -> u64 {
        self.inference_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a successfully processed frame
    pub fn record_frame(&self, hand_detected: bool) {
        self.last_frame_time.store(unix_micros(), Ordering::Relaxed);
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        if hand_detected {
            self.hands_detected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Restart the stall timer, e.g. when a new session begins
    pub fn touch(&self) {
        self.last_frame_time.store(unix_micros(), Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn stale_frames(&self) -> u64 {
        self.stale_frames.load(Ordering::Relaxed)
    }

    pub fn warmup_frames(&self) -> u64 {
        self.warmup_frames.load(Ordering::Relaxed)
    }

    pub fn inference_calls(&self) -> u64 {
        self.inference_calls.load(Ordering::Relaxed)
    }

    pub fn inference_failures(&self) -> u64 {
        self.inference_failures.load(Ordering::Relaxed)
    }

    pub fn hands_detected(&self) -> u64 {
        self.hands_detected.load(Ordering::Relaxed)
    }

    /// Get the timestamp of the last frame (Unix microseconds)
    pub fn last_frame_time(&self) -> u64 {
        self.last_frame_time.load(Ordering::Relaxed)
    }

    /// Share of processed frames with a detected hand, as a percentage
    pub fn detection_rate(&self) -> f64 {
        let processed = self.frames_processed();
        if processed == 0 {
            return 0.0;
        }
        (self.hands_detected() as f64 / processed as f64) * 100.0
    }

    /// Check if the pipeline has stalled (no frames for given duration)
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        let elapsed_micros = unix_micros().saturating_sub(self.last_frame_time());
        elapsed_micros > threshold.as_micros() as u64
    }

    /// Get a summary of health metrics
    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            ticks: self.ticks(),
            frames_processed: self.frames_processed(),
            stale_frames: self.stale_frames(),
            warmup_frames: self.warmup_frames(),
            inference_calls: self.inference_calls(),
            inference_failures: self.inference_failures(),
            hands_detected: self.hands_detected(),
            detection_rate: self.detection_rate(),
        }
    }
}

impl Default for PipelineHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of health metrics
#[derive(Debug, Clone)]
pub struct HealthSummary {
    pub ticks: u64,
    pub frames_processed: u64,
    pub stale_frames: u64,
    pub warmup_frames: u64,
    pub inference_calls: u64,
    pub inference_failures: u64,
    pub hands_detected: u64,
    pub detection_rate: f64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Health: {} ticks, {} frames ({} stale, {} warm-up), {} inference calls ({} failed), hand in {:.1}%",
            self.ticks,
            self.frames_processed,
            self.stale_frames,
            self.warmup_frames,
            self.inference_calls,
            self.inference_failures,
            self.detection_rate
        )
    }
}

/// Health alert types
#[derive(Debug, Clone, PartialEq)]
pub enum HealthAlert {
    /// No new frame processed for the threshold duration
    Stalled { duration: Duration },

    /// Detector calls failed since the previous check
    InferenceFailures { count: u64 },
}

impl std::fmt::Display for HealthAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthAlert::Stalled { duration } => {
                write!(f, "Frame source stalled for {:?}", duration)
            }
            HealthAlert::InferenceFailures { count } => {
                write!(f, "Inference failures: {}", count)
            }
        }
    }
}

/// Health monitoring service
///
/// Periodically checks pipeline health and sends alerts when issues are
/// detected. A summary is logged every `summary_interval`.
pub struct HealthMonitor {
    health: Arc<PipelineHealth>,
    alert_tx: mpsc::Sender<HealthAlert>,
    check_interval: Duration,
    stall_threshold: Duration,
    summary_interval: Duration,
}

impl HealthMonitor {
    /// Create a new health monitor
    pub fn new(health: Arc<PipelineHealth>, alert_tx: mpsc::Sender<HealthAlert>) -> Self {
        Self {
            health,
            alert_tx,
            check_interval: Duration::from_secs(5),
            stall_threshold: Duration::from_secs(5),
            summary_interval: Duration::from_secs(30),
        }
    }

    /// Configure the check interval
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Configure the stall threshold
    pub fn with_stall_threshold(mut self, threshold: Duration) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Configure how often the summary is logged
    pub fn with_summary_interval(mut self, interval: Duration) -> Self {
        self.summary_interval = interval;
        self
    }

    /// Run the health monitor until `cancel` fires
    pub async fn run_until(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.check_interval);
        let mut summary = tokio::time::interval(self.summary_interval);
        // Both intervals fire immediately; skip that first tick
        interval.tick().await;
        summary.tick().await;

        let mut last_inference_failures = self.health.inference_failures();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = summary.tick() => {
                    info!("{}", self.health.summary());
                }
                _ = interval.tick() => {
                    for alert in self.check(&mut last_inference_failures) {
                        if self.alert_tx.send(alert).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    fn check(&self, last_inference_failures: &mut u64) -> Vec<HealthAlert> {
        let mut alerts = Vec::new();

        // Check for stall
        if self.health.is_stalled(self.stall_threshold) {
            alerts.push(HealthAlert::Stalled {
                duration: self.stall_threshold,
            });
        }

        // Check for new inference failures
        let failures = self.health.inference_failures();
        if failures > *last_inference_failures {
            alerts.push(HealthAlert::InferenceFailures {
                count: failures - *last_inference_failures,
            });
            *last_inference_failures = failures;
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_metrics() {
        let health = PipelineHealth::new();

        health.record_inference_call();
        health.record_frame(true);
        health.record_inference_call();
        health.record_frame(false);
        health.record_stale_frame();
        health.record_warmup_frame();

        assert_eq!(health.frames_processed(), 2);
        assert_eq!(health.hands_detected(), 1);
        assert_eq!(health.inference_calls(), 2);
        assert_eq!(health.stale_frames(), 1);
        assert_eq!(health.warmup_frames(), 1);
        assert_eq!(health.detection_rate(), 50.0);

        assert_eq!(health.record_inference_failure(), 1);
        assert_eq!(health.record_inference_failure(), 2);
        assert!(health.summary().to_string().contains("(2 failed)"));
    }

    #[test]
    fn test_stall_detection() {
        let health = PipelineHealth::new();

        // Should not be stalled immediately
        assert!(!health.is_stalled(Duration::from_secs(1)));

        health.record_frame(false);

        // Simulate stall by not recording frames
        std::thread::sleep(Duration::from_millis(150));

        // Should be stalled after 150ms if threshold is 100ms
        assert!(health.is_stalled(Duration::from_millis(100)));

        health.touch();
        assert!(!health.is_stalled(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_monitor_reports_new_failures_once() {
        let health = Arc::new(PipelineHealth::new());
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = HealthMonitor::new(health.clone(), tx)
            .with_check_interval(Duration::from_millis(10))
            .with_stall_threshold(Duration::from_secs(60));

        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { monitor.run_until(cancel).await })
        };

        // Let the monitor take its baseline first
        tokio::time::sleep(Duration::from_millis(20)).await;
        health.record_inference_failure();
        health.record_inference_failure();

        let alert = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alert, HealthAlert::InferenceFailures { count: 2 });

        // No new failures, so nothing else arrives
        assert!(
            tokio::time::timeout(Duration::from_millis(50), rx.recv())
                .await
                .is_err()
        );

        cancel.cancel();
        handle.await.unwrap();
    }
}
