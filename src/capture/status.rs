//! Capture status management

use log::{error, info, warn};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Camera acquisition state machine
///
/// Transitions are validated so that status handlers never observe an
/// impossible sequence (e.g. `Idle` → `Active` without a request).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    /// No device held
    #[default]
    Idle,

    /// Constraint tiers are being tried
    Requesting,

    /// A stream is open and has produced its first frame
    Active,

    /// The last acquisition failed, or the landmark service could not load
    Error,
}

impl CaptureStatus {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &CaptureStatus) -> bool {
        use CaptureStatus::*;

        match (self, target) {
            (Idle, Requesting) => true,
            // Initialization failures are reported before any request
            (Idle, Error) => true,

            (Requesting, Active) => true,
            (Requesting, Error) => true,
            (Requesting, Idle) => true,

            (Active, Idle) => true,
            (Active, Requesting) => true,
            (Active, Error) => true,

            // Retry, or reset by an explicit release
            (Error, Requesting) => true,
            (Error, Idle) => true,

            (a, b) if a == b => true,

            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            CaptureStatus::Idle => "idle",
            CaptureStatus::Requesting => "requesting",
            CaptureStatus::Active => "active",
            CaptureStatus::Error => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CaptureStatus::Error)
    }
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Callback invoked on every status transition
pub type StatusHandler = Arc<dyn Fn(CaptureStatus, Option<&str>) + Send + Sync>;

/// Shared status cell plus the registered status handler.
///
/// Clones share state, so the tracker, the acquisition and callers all see
/// the same value.
#[derive(Clone)]
pub struct StatusReporter {
    current: Arc<watch::Sender<CaptureStatus>>,
    message: Arc<Mutex<Option<String>>>,
    handler: Arc<Mutex<Option<StatusHandler>>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CaptureStatus::Idle);
        Self {
            current: Arc::new(tx),
            message: Arc::new(Mutex::new(None)),
            handler: Arc::new(Mutex::new(None)),
        }
    }

    /// Register the status handler, replacing any previous one
    pub fn set_handler(&self, handler: StatusHandler) {
        let mut guard = self.handler.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(handler);
    }

    pub fn get(&self) -> CaptureStatus {
        *self.current.borrow()
    }

    /// Message attached to the current status, if any
    pub fn message(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<CaptureStatus> {
        self.current.subscribe()
    }

    /// Move to `status` and notify the handler.
    pub fn set(&self, status: CaptureStatus, message: Option<String>) {
        let previous = self.get();
        if !previous.can_transition_to(&status) {
            warn!("Unexpected capture status transition {previous} -> {status}");
        }

        {
            let mut guard = self.message.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone_from(&message);
        }
        self.current.send_replace(status);

        match &message {
            Some(msg) => info!("Camera status: {status} ({msg})"),
            None => info!("Camera status: {status}"),
        }

        let handler = self
            .handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(handler) = handler {
            if catch_unwind(AssertUnwindSafe(|| handler(status, message.as_deref()))).is_err() {
                error!("Status handler panicked on {status}");
            }
        }
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}
