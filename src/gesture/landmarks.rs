//! Hand landmark storage
//!
//! A hand is 21 normalized points indexed by anatomical role, wrist first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// HAND LANDMARK INDICES
// ============================================================================

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Fingertips, thumb to pinky
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One tracked point in normalized camera space.
///
/// `x` and `y` are in [0, 1]; `z` is a relative depth cue, not metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in 3-D normalized space
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LandmarkError {
    #[error("expected 21 landmarks, got {0}")]
    WrongCount(usize),
    #[error("landmark {0} has a non-finite coordinate")]
    NonFinite(usize),
}

/// Exactly 21 landmarks for a single detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarkSet {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Result<Self, LandmarkError> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFinite(index));
        }
        Ok(Self { points })
    }

    /// Build a set from `[x, y, z]` triples, as emitted by landmark engines
    pub fn from_triples(triples: &[[f32; 3]]) -> Result<Self, LandmarkError> {
        let points: Vec<Landmark> = triples.iter().copied().map(Landmark::from).collect();
        Self::try_from(points.as_slice())
    }

    pub fn wrist(&self) -> &Landmark {
        &self.points[WRIST]
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    pub fn fingertips(&self) -> impl Iterator<Item = &Landmark> {
        FINGERTIPS.iter().map(|&idx| &self.points[idx])
    }
}

impl TryFrom<&[Landmark]> for HandLandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: &[Landmark]) -> Result<Self, Self::Error> {
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongCount(points.len()))?;
        Self::new(points)
    }
}

impl std::ops::Index<usize> for HandLandmarkSet {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(0.3, 0.4, 0.0);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_wrong_count_rejected() {
        let triples = vec![[0.5f32, 0.5, 0.0]; 20];
        assert_eq!(
            HandLandmarkSet::from_triples(&triples),
            Err(LandmarkError::WrongCount(20))
        );

        let triples = vec![[0.5f32, 0.5, 0.0]; 22];
        assert_eq!(
            HandLandmarkSet::from_triples(&triples),
            Err(LandmarkError::WrongCount(22))
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut triples = vec![[0.5f32, 0.5, 0.0]; LANDMARK_COUNT];
        triples[7] = [f32::NAN, 0.5, 0.0];
        assert_eq!(
            HandLandmarkSet::from_triples(&triples),
            Err(LandmarkError::NonFinite(7))
        );
    }

    #[test]
    fn test_indexing() {
        let triples: Vec<[f32; 3]> = (0..LANDMARK_COUNT)
            .map(|i| [i as f32 / 100.0, 0.5, 0.0])
            .collect();
        let hand = HandLandmarkSet::from_triples(&triples).unwrap();

        assert_eq!(hand.wrist().x, 0.0);
        assert_eq!(hand[INDEX_TIP].x, 0.08);
        assert_eq!(hand.get(LANDMARK_COUNT), None);

        let tips: Vec<f32> = hand.fingertips().map(|p| p.x).collect();
        assert_eq!(tips, vec![0.04, 0.08, 0.12, 0.16, 0.2]);
    }
}
