//! Core types for the pipeline system

use bytes::Bytes;
use std::time::Duration;

/// Timestamp representation for video frames and detection calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Microseconds since the owning clock or stream started
    pub micros: i64,
}

impl Timestamp {
    /// Create a new timestamp from microseconds
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a new timestamp from milliseconds
    pub fn from_millis(millis: i64) -> Self {
        Self {
            micros: millis.saturating_mul(1_000),
        }
    }

    /// Create a timestamp from a duration since the time base
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            micros: duration.as_micros() as i64,
        }
    }

    /// Fractional milliseconds, the unit landmark engines expect
    pub fn as_millis_f64(&self) -> f64 {
        self.micros as f64 / 1_000.0
    }

}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}µs", self.micros)
    }
}

/// A single decoded video frame as exposed by a capture stream.
///
/// `timestamp` is the media time of the frame inside its stream. Two reads
/// returning the same timestamp mean the video has not advanced.
#[derive(Clone)]
pub struct VideoFrame {
    /// Raw pixel data (RGB8)
    pub data: Bytes,

    /// Frame width in pixels, zero while the device is warming up
    pub width: u32,

    /// Frame height in pixels, zero while the device is warming up
    pub height: u32,

    /// Media time of this frame
    pub timestamp: Timestamp,

    /// Monotonic frame counter within the stream
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame
    pub fn new(data: Bytes, width: u32, height: u32, timestamp: Timestamp, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp,
            sequence,
        }
    }

    /// A zero-area frame, as reported by a device that has not warmed up yet
    pub fn empty(timestamp: Timestamp, sequence: u64) -> Self {
        Self::new(Bytes::new(), 0, 0, timestamp, sequence)
    }

    /// Whether this frame has no usable pixels
    pub fn is_empty_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Get the size of the frame data in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .field("sequence", &self.sequence)
            .field("size", &self.size())
            .finish()
    }
}
