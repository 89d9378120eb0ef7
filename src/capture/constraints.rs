//! Capture constraint tiers

use serde::{Deserialize, Serialize};

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, looking at the user
    User,
    /// Rear camera
    Environment,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "back" | "rear" => Ok(FacingMode::Environment),
            other => Err(format!("unknown facing mode '{other}'")),
        }
    }
}

/// One fallback option in the acquisition sequence.
///
/// Resolution values are ideals: a device may deliver something else.
/// Facing mode is a hard requirement when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    pub facing: Option<FacingMode>,
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
}

impl CaptureConstraints {
    /// Any video device
    pub fn any() -> Self {
        Self::default()
    }

    /// Front-facing camera, any resolution
    pub fn front() -> Self {
        Self {
            facing: Some(FacingMode::User),
            ..Self::default()
        }
    }

    /// Front-facing camera with a preferred resolution
    pub fn front_with_resolution(width: u32, height: u32) -> Self {
        Self {
            facing: Some(FacingMode::User),
            ideal_width: Some(width),
            ideal_height: Some(height),
        }
    }

    /// Default tiers, most specific first: a low resolution front camera keeps
    /// inference cheap on small devices.
    pub fn default_tiers() -> Vec<Self> {
        vec![
            Self::front_with_resolution(480, 640),
            Self::front(),
            Self::any(),
        ]
    }

    pub fn is_any(&self) -> bool {
        *self == Self::any()
    }
}

impl std::fmt::Display for CaptureConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_any() {
            return write!(f, "any camera");
        }
        match self.facing {
            Some(facing) => write!(f, "facing={facing}")?,
            None => write!(f, "facing=any")?,
        }
        if let (Some(w), Some(h)) = (self.ideal_width, self.ideal_height) {
            write!(f, " ideal={w}x{h}")?;
        }
        Ok(())
    }
}
