//! Tracking pipeline for handcast
//!
//! Separates the concerns of one tracking session:
//! - Scheduling: a fixed-cadence loop gated on new frames
//! - Output: per-frame `HandData` delivery
//! - Control: the `HandTracker` coordinator that owns the enable flag
//! - Observability: clock and health counters
//!
//! # Architecture
//!
//! - `HandTracker` spawns one supervisor task per session
//! - The supervisor acquires the camera and runs a fresh `FrameScheduler`
//! - `PipelineClock` stamps detector calls with strictly increasing times
//! - `HealthMonitor` watches for stalls and inference failures

pub mod clock;
pub mod coordinator;
pub mod health;
pub mod publisher;
pub mod scheduler;
pub mod types;

pub use clock::PipelineClock;
pub use coordinator::HandTracker;
pub use health::{HealthAlert, HealthMonitor, HealthSummary, PipelineHealth};
pub use publisher::{HandData, HandDataHandler, HandDataPublisher};
pub use scheduler::{FrameScheduler, TickOutcome};
pub use types::{Timestamp, VideoFrame};
