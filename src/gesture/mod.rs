//! Hand landmark geometry, per-frame classification and temporal stabilization

pub mod classifier;
pub mod landmarks;
pub mod stabilizer;

use serde::{Deserialize, Serialize};

pub use classifier::{Classification, classify};
pub use landmarks::{HandLandmarkSet, Landmark, LandmarkError};
pub use stabilizer::GestureStabilizer;

/// Discrete hand gesture.
///
/// Used both for the classifier's raw per-frame guess and for the
/// stabilizer's confirmed value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    /// No hand in frame
    #[default]
    None,
    OpenPalm,
    ClosedFist,
    Pinch,
}

impl Gesture {
    /// Wire name of the gesture
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::None => "NONE",
            Gesture::OpenPalm => "OPEN_PALM",
            Gesture::ClosedFist => "CLOSED_FIST",
            Gesture::Pinch => "PINCH",
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_wire_names() {
        assert_eq!(serde_json::to_string(&Gesture::OpenPalm).unwrap(), "\"OPEN_PALM\"");
        assert_eq!(
            serde_json::from_str::<Gesture>("\"CLOSED_FIST\"").unwrap(),
            Gesture::ClosedFist
        );
        assert_eq!(Gesture::Pinch.to_string(), "PINCH");
        assert_eq!(Gesture::default(), Gesture::None);
    }
}
