//! Geometric gesture classifier
//!
//! Stateless: one landmark set in, one raw gesture out. Rules are evaluated
//! in priority order and the first match wins, so a tight fist with touching
//! thumb and index tips reads as a pinch.

use super::Gesture;
use super::landmarks::{HandLandmarkSet, INDEX_TIP, THUMB_TIP};

/// Thumb-tip to index-tip distance under which the hand is pinching
pub const PINCH_THRESHOLD: f32 = 0.05;

/// Mean wrist-to-fingertip distance under which the hand is a fist
pub const FIST_THRESHOLD: f32 = 0.25;

/// Pointer location reported when no hand is visible
pub const DEFAULT_POINTER: (f32, f32) = (0.5, 0.5);

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub gesture: Gesture,
    /// Mirrored wrist x, or the default midpoint when nothing is detected
    pub x: f32,
    pub y: f32,
    pub detected: bool,
}

/// Classify the (optional) hand found in a frame.
pub fn classify(hand: Option<&HandLandmarkSet>) -> Classification {
    match hand {
        Some(hand) => {
            let (x, y) = pointer(hand);
            Classification {
                gesture: classify_landmarks(hand),
                x,
                y,
                detected: true,
            }
        }
        None => Classification {
            gesture: Gesture::None,
            x: DEFAULT_POINTER.0,
            y: DEFAULT_POINTER.1,
            detected: false,
        },
    }
}

/// Geometric rules for a detected hand. Never returns [`Gesture::None`].
pub fn classify_landmarks(hand: &HandLandmarkSet) -> Gesture {
    if pinch_distance(hand) < PINCH_THRESHOLD {
        Gesture::Pinch
    } else if average_tip_distance(hand) < FIST_THRESHOLD {
        Gesture::ClosedFist
    } else {
        Gesture::OpenPalm
    }
}

pub fn pinch_distance(hand: &HandLandmarkSet) -> f32 {
    hand[THUMB_TIP].distance(&hand[INDEX_TIP])
}

pub fn average_tip_distance(hand: &HandLandmarkSet) -> f32 {
    let wrist = hand.wrist();
    let (sum, count) = hand
        .fingertips()
        .fold((0.0f32, 0usize), |(sum, count), tip| {
            (sum + tip.distance(wrist), count + 1)
        });
    sum / count as f32
}

/// Wrist position with x mirrored for a front-facing camera
pub fn pointer(hand: &HandLandmarkSet) -> (f32, f32) {
    let wrist = hand.wrist();
    (1.0 - wrist.x, wrist.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::landmarks::{
        LANDMARK_COUNT, Landmark, MIDDLE_TIP, PINKY_TIP, RING_TIP, WRIST,
    };

    fn hand_with(tips: [(usize, [f32; 3]); 5], wrist: [f32; 3]) -> HandLandmarkSet {
        let mut points = [Landmark::from(wrist); LANDMARK_COUNT];
        points[WRIST] = Landmark::from(wrist);
        for (idx, p) in tips {
            points[idx] = Landmark::from(p);
        }
        HandLandmarkSet::new(points).unwrap()
    }

    #[test]
    fn test_no_hand() {
        let c = classify(None);
        assert_eq!(c.gesture, Gesture::None);
        assert!(!c.detected);
        assert_eq!((c.x, c.y), DEFAULT_POINTER);
    }

    #[test]
    fn test_pinch_takes_priority_over_fist() {
        // pinch distance 0.03, every tip about 0.10 from the wrist
        let hand = hand_with(
            [
                (THUMB_TIP, [0.6, 0.5, 0.0]),
                (INDEX_TIP, [0.6, 0.53, 0.0]),
                (MIDDLE_TIP, [0.4, 0.5, 0.0]),
                (RING_TIP, [0.5, 0.6, 0.0]),
                (PINKY_TIP, [0.5, 0.4, 0.0]),
            ],
            [0.5, 0.5, 0.0],
        );

        assert!((pinch_distance(&hand) - 0.03).abs() < 1e-4);
        assert!(average_tip_distance(&hand) < FIST_THRESHOLD);
        assert_eq!(classify_landmarks(&hand), Gesture::Pinch);
    }

    #[test]
    fn test_fist() {
        let hand = hand_with(
            [
                (THUMB_TIP, [0.6, 0.5, 0.0]),
                (INDEX_TIP, [0.4, 0.5, 0.0]),
                (MIDDLE_TIP, [0.5, 0.6, 0.0]),
                (RING_TIP, [0.5, 0.4, 0.0]),
                (PINKY_TIP, [0.5, 0.5, 0.1]),
            ],
            [0.5, 0.5, 0.0],
        );
        assert_eq!(classify_landmarks(&hand), Gesture::ClosedFist);
    }

    #[test]
    fn test_fist_boundary_is_strict() {
        // every tip exactly 0.25 from the wrist, thumb and index far apart
        let hand = hand_with(
            [
                (THUMB_TIP, [0.25, 0.5, 0.0]),
                (INDEX_TIP, [0.75, 0.5, 0.0]),
                (MIDDLE_TIP, [0.5, 0.25, 0.0]),
                (RING_TIP, [0.5, 0.75, 0.0]),
                (PINKY_TIP, [0.5, 0.5, 0.25]),
            ],
            [0.5, 0.5, 0.0],
        );

        assert_eq!(average_tip_distance(&hand), 0.25);
        assert_eq!(classify_landmarks(&hand), Gesture::OpenPalm);
    }

    #[test]
    fn test_spread_hand_is_open_palm() {
        let hand = hand_with(
            [
                (THUMB_TIP, [0.5, 0.0, 0.0]),
                (INDEX_TIP, [0.5, 0.0, 0.0625]),
                (MIDDLE_TIP, [0.0, 0.5, 0.0]),
                (RING_TIP, [1.0, 0.5, 0.0]),
                (PINKY_TIP, [0.5, 1.0, 0.0]),
            ],
            [0.5, 0.5, 0.0],
        );
        assert!(pinch_distance(&hand) >= PINCH_THRESHOLD);
        assert_eq!(classify_landmarks(&hand), Gesture::OpenPalm);
    }

    #[test]
    fn test_pointer_is_mirrored_wrist() {
        let hand = hand_with(
            [
                (THUMB_TIP, [0.2, 0.1, 0.0]),
                (INDEX_TIP, [0.9, 0.1, 0.0]),
                (MIDDLE_TIP, [0.5, 0.0, 0.0]),
                (RING_TIP, [0.2, 0.9, 0.0]),
                (PINKY_TIP, [0.9, 0.9, 0.0]),
            ],
            [0.25, 0.75, 0.0],
        );

        let c = classify(Some(&hand));
        assert!(c.detected);
        assert_eq!(c.gesture, Gesture::OpenPalm);
        assert_eq!((c.x, c.y), (0.75, 0.75));
    }
}
