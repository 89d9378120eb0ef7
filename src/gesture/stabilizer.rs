//! Temporal debounce over the raw gesture stream
//!
//! Acquiring a gesture needs [`STABILITY_FRAMES`] identical samples in a row.
//! Losing the hand releases after only [`RELEASE_FRAMES`] `NONE` samples so
//! the confirmed value never sticks once the hand leaves the frame.

use std::collections::VecDeque;

use super::Gesture;

/// History capacity and the number of agreeing frames needed to confirm
pub const STABILITY_FRAMES: usize = 5;

/// Consecutive `NONE` frames that release the confirmed gesture
pub const RELEASE_FRAMES: usize = 3;

#[derive(Debug, Clone)]
pub struct GestureStabilizer {
    history: VecDeque<Gesture>,
    confirmed: Gesture,
}

impl GestureStabilizer {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(STABILITY_FRAMES),
            confirmed: Gesture::None,
        }
    }

    /// Feed one raw sample and return the (possibly unchanged) confirmed gesture.
    pub fn observe(&mut self, raw: Gesture) -> Gesture {
        self.history.push_back(raw);
        if self.history.len() > STABILITY_FRAMES {
            self.history.pop_front();
        }

        let all_match =
            self.history.len() == STABILITY_FRAMES && self.history.iter().all(|g| *g == raw);

        let quick_release = raw == Gesture::None
            && self.history.len() >= RELEASE_FRAMES
            && self
                .history
                .iter()
                .rev()
                .take(RELEASE_FRAMES)
                .all(|g| *g == Gesture::None);

        if all_match || quick_release {
            self.confirmed = raw;
        }

        self.confirmed
    }

    pub fn confirmed(&self) -> Gesture {
        self.confirmed
    }

    pub fn history(&self) -> impl Iterator<Item = &Gesture> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Forget all samples and fall back to [`Gesture::None`]
    pub fn reset(&mut self) {
        self.history.clear();
        self.confirmed = Gesture::None;
    }
}

impl Default for GestureStabilizer {
    fn default() -> Self {
        Self::new()
    }
}
