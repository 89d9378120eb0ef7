//! Fixed-cadence frame loop
//!
//! One tick reads the current camera frame, runs it through the detector
//! when the video has advanced, then classifies, stabilizes and publishes the
//! result before the next tick starts.

use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::clock::PipelineClock;
use super::health::PipelineHealth;
use super::publisher::{HandData, HandDataPublisher};
use super::types::{Timestamp, VideoFrame};
use crate::capture::{CameraAcquisition, CaptureSession};
use crate::gesture::{GestureStabilizer, classify};
use crate::inference::LandmarkDetector;

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The enable flag is down; the loop must not continue
    Stopped,
    /// No live capture session
    SkippedNoSession,
    /// No frame yet, or a zero-area frame from a warming device
    SkippedWarmup,
    /// The video has not advanced since the previous processed frame
    SkippedStale,
    /// The detector returned an error; nothing was published
    InferenceFailed,
    Processed(HandData),
}

/// Owns all per-session tracking state.
///
/// Create one scheduler per capture session so history and the last
/// processed timestamp never leak across sessions.
pub struct FrameScheduler {
    stabilizer: GestureStabilizer,
    last_frame_timestamp: Option<Timestamp>,
    clock: PipelineClock,
    publisher: HandDataPublisher,
    health: Arc<PipelineHealth>,
    cancel: CancellationToken,
    tick_interval: Duration,
}

impl FrameScheduler {
    pub fn new(
        clock: PipelineClock,
        publisher: HandDataPublisher,
        health: Arc<PipelineHealth>,
        cancel: CancellationToken,
        tick_interval: Duration,
    ) -> Self {
        Self {
            stabilizer: GestureStabilizer::new(),
            last_frame_timestamp: None,
            clock,
            publisher,
            health,
            cancel,
            tick_interval,
        }
    }

    /// Run one tick against the given session.
    pub async fn tick(
        &mut self,
        session: Option<&CaptureSession>,
        detector: &mut dyn LandmarkDetector,
    ) -> TickOutcome {
        if self.cancel.is_cancelled() {
            return TickOutcome::Stopped;
        }
        self.health.record_tick();

        let Some(session) = session.filter(|s| s.is_live()) else {
            return TickOutcome::SkippedNoSession;
        };

        self.process_frame(session.current_frame(), detector).await
    }

    async fn process_frame(
        &mut self,
        frame: Option<VideoFrame>,
        detector: &mut dyn LandmarkDetector,
    ) -> TickOutcome {
        let frame = match frame {
            Some(frame) if !frame.is_empty_area() => frame,
            _ => {
                self.health.record_warmup_frame();
                return TickOutcome::SkippedWarmup;
            }
        };

        if self.last_frame_timestamp == Some(frame.timestamp) {
            self.health.record_stale_frame();
            return TickOutcome::SkippedStale;
        }
        self.last_frame_timestamp = Some(frame.timestamp);

        let timestamp = self.clock.next_detection_timestamp();
        self.health.record_inference_call();

        let hand = match detector.detect(&frame, timestamp.as_millis_f64()).await {
            Ok(hand) => hand,
            Err(e) => {
                let failures = self.health.record_inference_failure();
                if failures % 30 == 1 {
                    warn!("Hand detection failed on frame {}: {e:#} ({failures} total)", frame.sequence);
                }
                return TickOutcome::InferenceFailed;
            }
        };

        let classification = classify(hand.as_ref());
        let confirmed = self.stabilizer.observe(classification.gesture);
        trace!(
            "Frame {}: raw {} confirmed {}",
            frame.sequence, classification.gesture, confirmed
        );

        let data = self.publisher.publish(
            confirmed,
            classification.x,
            classification.y,
            classification.detected,
        );
        self.health.record_frame(classification.detected);

        TickOutcome::Processed(data)
    }

    /// Tick at the configured cadence until the enable flag drops.
    pub async fn run(
        &mut self,
        acquisition: &CameraAcquisition,
        detector: &mut dyn LandmarkDetector,
    ) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Frame scheduler started ({:?} per tick)", self.tick_interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if self.tick(acquisition.session(), detector).await == TickOutcome::Stopped {
                break;
            }
        }

        debug!("Frame scheduler stopped, confirmed gesture {}", self.stabilizer.confirmed());
    }

    pub fn confirmed(&self) -> crate::gesture::Gesture {
        self.stabilizer.confirmed()
    }

    pub fn last_frame_timestamp(&self) -> Option<Timestamp> {
        self.last_frame_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        CaptureConstraints, CaptureDevice, CaptureError, StatusReporter, VideoStream,
    };
    use crate::gesture::{Gesture, HandLandmarkSet};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type SharedFrame = Arc<Mutex<Option<VideoFrame>>>;

    struct ManualStream(SharedFrame);

    #[async_trait]
    impl VideoStream for ManualStream {
        fn current_frame(&self) -> Option<VideoFrame> {
            self.0.lock().unwrap().clone()
        }

        async fn wait_playable(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn is_live(&self) -> bool {
            true
        }
    }

    struct ManualCamera(SharedFrame);

    #[async_trait]
    impl CaptureDevice for ManualCamera {
        async fn request_stream(
            &self,
            _constraints: &CaptureConstraints,
        ) -> Result<Box<dyn VideoStream>, CaptureError> {
            Ok(Box::new(ManualStream(self.0.clone())))
        }
    }

    /// Returns a fixed answer and counts calls
    struct CountingDetector {
        calls: Arc<AtomicUsize>,
        hand: Option<HandLandmarkSet>,
        fail: bool,
    }

    #[async_trait]
    impl LandmarkDetector for CountingDetector {
        async fn detect(
            &mut self,
            _frame: &VideoFrame,
            _timestamp_ms: f64,
        ) -> anyhow::Result<Option<HandLandmarkSet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("engine error");
            }
            Ok(self.hand.clone())
        }
    }

    fn frame(ts_ms: i64) -> VideoFrame {
        VideoFrame::new(Bytes::from_static(&[0; 12]), 2, 2, Timestamp::from_millis(ts_ms), 0)
    }

    fn open_hand() -> HandLandmarkSet {
        let mut triples = [[0.5f32, 0.8, 0.0]; 21];
        for (i, tip) in [4usize, 8, 12, 16, 20].into_iter().enumerate() {
            triples[tip] = [0.2 + 0.15 * i as f32, 0.2, 0.0];
        }
        HandLandmarkSet::from_triples(&triples).unwrap()
    }

    struct Harness {
        frame: SharedFrame,
        acquisition: CameraAcquisition,
        scheduler: FrameScheduler,
        cancel: CancellationToken,
        health: Arc<PipelineHealth>,
    }

    async fn harness() -> Harness {
        let frame: SharedFrame = Arc::new(Mutex::new(None));
        let mut acquisition = CameraAcquisition::new(
            Arc::new(ManualCamera(frame.clone())),
            vec![CaptureConstraints::any()],
            Duration::from_secs(1),
            StatusReporter::new(),
        );
        acquisition.acquire().await.unwrap();

        let cancel = CancellationToken::new();
        let health = Arc::new(PipelineHealth::new());
        let scheduler = FrameScheduler::new(
            PipelineClock::new(),
            HandDataPublisher::new(),
            health.clone(),
            cancel.clone(),
            Duration::from_millis(5),
        );

        Harness {
            frame,
            acquisition,
            scheduler,
            cancel,
            health,
        }
    }

    fn detector(hand: Option<HandLandmarkSet>) -> (CountingDetector, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CountingDetector {
                calls: calls.clone(),
                hand,
                fail: false,
            },
            calls,
        )
    }

    #[tokio::test]
    async fn test_stale_frame_skips_inference() {
        let mut h = harness().await;
        let (mut det, calls) = detector(None);

        *h.frame.lock().unwrap() = Some(frame(33));
        let first = h.scheduler.tick(h.acquisition.session(), &mut det).await;
        let second = h.scheduler.tick(h.acquisition.session(), &mut det).await;

        assert!(matches!(first, TickOutcome::Processed(_)));
        assert_eq!(second, TickOutcome::SkippedStale);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.health.stale_frames(), 1);

        *h.frame.lock().unwrap() = Some(frame(66));
        let third = h.scheduler.tick(h.acquisition.session(), &mut det).await;
        assert!(matches!(third, TickOutcome::Processed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_warmup_frames_are_skipped() {
        let mut h = harness().await;
        let (mut det, calls) = detector(None);

        let outcome = h.scheduler.tick(h.acquisition.session(), &mut det).await;
        assert_eq!(outcome, TickOutcome::SkippedWarmup);

        *h.frame.lock().unwrap() = Some(VideoFrame::empty(Timestamp::from_millis(10), 0));
        let outcome = h.scheduler.tick(h.acquisition.session(), &mut det).await;
        assert_eq!(outcome, TickOutcome::SkippedWarmup);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(h.scheduler.last_frame_timestamp().is_none());
    }

    #[tokio::test]
    async fn test_no_session_is_skipped() {
        let mut h = harness().await;
        let (mut det, calls) = detector(None);
        h.acquisition.release();

        let outcome = h.scheduler.tick(h.acquisition.session(), &mut det).await;
        assert_eq!(outcome, TickOutcome::SkippedNoSession);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_scheduler_stops() {
        let mut h = harness().await;
        let (mut det, calls) = detector(None);
        *h.frame.lock().unwrap() = Some(frame(1));

        h.cancel.cancel();
        let outcome = h.scheduler.tick(h.acquisition.session(), &mut det).await;
        assert_eq!(outcome, TickOutcome::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // run() returns right away as well
        tokio::time::timeout(
            Duration::from_secs(1),
            h.scheduler.run(&h.acquisition, &mut det),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_detected_hand_confirms_after_five_frames() {
        let mut h = harness().await;
        let (mut det, _calls) = detector(Some(open_hand()));

        let mut last = None;
        for ts in 1..=5 {
            *h.frame.lock().unwrap() = Some(frame(ts * 33));
            match h.scheduler.tick(h.acquisition.session(), &mut det).await {
                TickOutcome::Processed(data) => last = Some((ts, data)),
                other => panic!("unexpected outcome {other:?}"),
            }
            if ts < 5 {
                assert_eq!(h.scheduler.confirmed(), Gesture::None);
            }
        }

        let (_, data) = last.unwrap();
        assert_eq!(data.gesture, Gesture::OpenPalm);
        assert!(data.detected);
        assert!((data.x - 0.5).abs() < 1e-6);
        assert!((data.y - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_inference_error_publishes_nothing() {
        let mut h = harness().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let mut det = CountingDetector {
            calls: calls.clone(),
            hand: None,
            fail: true,
        };

        *h.frame.lock().unwrap() = Some(frame(5));
        let outcome = h.scheduler.tick(h.acquisition.session(), &mut det).await;

        assert_eq!(outcome, TickOutcome::InferenceFailed);
        assert_eq!(h.health.inference_failures(), 1);
        assert_eq!(h.health.frames_processed(), 0);
    }

    #[tokio::test]
    async fn test_run_processes_frames_until_cancelled() {
        let mut h = harness().await;
        let (mut det, calls) = detector(None);
        *h.frame.lock().unwrap() = Some(frame(1));

        let cancel = h.cancel.clone();
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        h.scheduler.run(&h.acquisition, &mut det).await;
        stopper.await.unwrap();

        // A single unchanging frame is only processed once
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(h.health.ticks() > 1);
    }
}
