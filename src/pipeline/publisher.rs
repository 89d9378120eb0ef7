//! Per-frame output delivery

use log::error;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::gesture::Gesture;
use crate::gesture::classifier::DEFAULT_POINTER;

/// The record handed to consumers on every processed frame.
///
/// `x` and `y` only describe a real location when `detected` is true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandData {
    pub gesture: Gesture,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "isDetected")]
    pub detected: bool,
}

impl Default for HandData {
    fn default() -> Self {
        Self {
            gesture: Gesture::None,
            x: DEFAULT_POINTER.0,
            y: DEFAULT_POINTER.1,
            detected: false,
        }
    }
}

pub type HandDataHandler = Arc<dyn Fn(HandData) + Send + Sync>;

/// Delivers [`HandData`] to the registered consumer.
///
/// No filtering or deduplication: every call reaches the handler.
#[derive(Clone)]
pub struct HandDataPublisher {
    handler: Arc<Mutex<Option<HandDataHandler>>>,
    latest: Arc<watch::Sender<HandData>>,
}

impl HandDataPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HandData::default());
        Self {
            handler: Arc::new(Mutex::new(None)),
            latest: Arc::new(tx),
        }
    }

    /// Register the consumer callback, replacing any previous one
    pub fn on_hand_data(&self, handler: HandDataHandler) {
        let mut guard = self.handler.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(handler);
    }

    /// Build a fresh record and hand it to the consumer.
    ///
    /// A panicking handler is logged and otherwise ignored.
    pub fn publish(&self, gesture: Gesture, x: f32, y: f32, detected: bool) -> HandData {
        let data = HandData {
            gesture,
            x,
            y,
            detected,
        };

        self.latest.send_replace(data);

        let handler = self
            .handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(handler) = handler {
            if catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
                error!("Hand data handler panicked; dropping {:?}", data);
            }
        }

        data
    }

    /// Most recently published record
    pub fn latest(&self) -> HandData {
        *self.latest.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HandData> {
        self.latest.subscribe()
    }
}

impl Default for HandDataPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_data_json_shape() {
        let data = HandData {
            gesture: Gesture::OpenPalm,
            x: 0.25,
            y: 0.75,
            detected: true,
        };

        let json = serde_json::to_value(data).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "gesture": "OPEN_PALM",
                "x": 0.25,
                "y": 0.75,
                "isDetected": true,
            })
        );
    }

    #[test]
    fn test_every_publish_reaches_handler() {
        let publisher = HandDataPublisher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        publisher.on_hand_data(Arc::new(move |data| sink.lock().unwrap().push(data)));

        publisher.publish(Gesture::None, 0.5, 0.5, false);
        publisher.publish(Gesture::None, 0.5, 0.5, false);

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(publisher.latest(), HandData::default());
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let publisher = HandDataPublisher::new();
        publisher.on_hand_data(Arc::new(|_| panic!("consumer bug")));

        let data = publisher.publish(Gesture::Pinch, 0.1, 0.2, true);
        assert_eq!(data.gesture, Gesture::Pinch);
        assert_eq!(publisher.latest(), data);

        // Still usable afterwards
        publisher.publish(Gesture::None, 0.5, 0.5, false);
        assert!(!publisher.latest().detected);
    }

    #[tokio::test]
    async fn test_subscribers_see_latest() {
        let publisher = HandDataPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish(Gesture::ClosedFist, 0.4, 0.6, true);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().gesture, Gesture::ClosedFist);
    }
}
