//! Camera capture module
//!
//! Provides video device acquisition through a pluggable [`CaptureDevice`]
//! backend. [`CameraAcquisition`] walks an ordered list of constraint tiers,
//! from the most specific to "any device", until one of them opens.

pub mod acquisition;
pub mod constraints;
pub mod status;
pub mod synthetic;
mod traits;

use thiserror::Error;

pub use acquisition::{CameraAcquisition, CaptureSession};
pub use constraints::{CaptureConstraints, FacingMode};
pub use status::{CaptureStatus, StatusHandler, StatusReporter};
pub use synthetic::{SyntheticCamera, SyntheticCameraConfig, SyntheticFault};
pub use traits::{CaptureDevice, VideoStream};

/// Failure to open or start a capture device.
///
/// The display strings are the user-facing messages reported through the
/// status handler. The backend detail is kept in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera permission denied; check system privacy settings")]
    PermissionDenied(String),
    #[error("no camera device found")]
    NotFound(String),
    #[error("camera is in use by another application")]
    DeviceBusy(String),
    #[error("camera error: {0}")]
    Unknown(String),
}

/// Classification of a [`CaptureError`] without its detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureErrorKind {
    PermissionDenied,
    NotFound,
    DeviceBusy,
    Unknown,
}

impl CaptureError {
    pub fn kind(&self) -> CaptureErrorKind {
        match self {
            CaptureError::PermissionDenied(_) => CaptureErrorKind::PermissionDenied,
            CaptureError::NotFound(_) => CaptureErrorKind::NotFound,
            CaptureError::DeviceBusy(_) => CaptureErrorKind::DeviceBusy,
            CaptureError::Unknown(_) => CaptureErrorKind::Unknown,
        }
    }

    /// Backend-specific detail
    pub fn detail(&self) -> &str {
        match self {
            CaptureError::PermissionDenied(d)
            | CaptureError::NotFound(d)
            | CaptureError::DeviceBusy(d)
            | CaptureError::Unknown(d) => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CaptureError::PermissionDenied("NotAllowedError".into());
        assert_eq!(err.kind(), CaptureErrorKind::PermissionDenied);
        assert_eq!(err.detail(), "NotAllowedError");
        assert_eq!(
            err.to_string(),
            "camera permission denied; check system privacy settings"
        );

        let err = CaptureError::Unknown("device vanished".into());
        assert_eq!(err.to_string(), "camera error: device vanished");
    }
}
