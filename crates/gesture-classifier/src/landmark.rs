//! Hand landmark data structures
//!
//! Models the 21-point hand used by MediaPipe-style trackers:
//! wrist at index 0, then four joints per digit (thumb, index, middle,
//! ring, pinky) ordered base to tip.

use crate::error::ObservationError;
use serde::{Deserialize, Serialize};

/// Number of landmarks in one observation
pub const LANDMARK_COUNT: usize = 21;

/// One tracked point in normalized tracking-space coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    /// Create landmark
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another landmark
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Component-wise difference `self - origin`
    #[inline]
    #[must_use]
    pub fn relative_to(&self, origin: &Landmark) -> Landmark {
        Landmark::new(self.x - origin.x, self.y - origin.y, self.z - origin.z)
    }

    /// Component-wise sum
    #[inline]
    #[must_use]
    pub fn offset_by(&self, delta: &Landmark) -> Landmark {
        Landmark::new(self.x + delta.x, self.y + delta.y, self.z + delta.z)
    }
}

/// Anatomical landmark indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandLandmark {
    /// Array index (0-20)
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The four non-thumb fingers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// All non-thumb fingers, radial to ulnar
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// Knuckle joint
    #[must_use]
    pub const fn mcp(self) -> HandLandmark {
        match self {
            Finger::Index => HandLandmark::IndexMcp,
            Finger::Middle => HandLandmark::MiddleMcp,
            Finger::Ring => HandLandmark::RingMcp,
            Finger::Pinky => HandLandmark::PinkyMcp,
        }
    }

    /// Middle joint
    #[must_use]
    pub const fn pip(self) -> HandLandmark {
        match self {
            Finger::Index => HandLandmark::IndexPip,
            Finger::Middle => HandLandmark::MiddlePip,
            Finger::Ring => HandLandmark::RingPip,
            Finger::Pinky => HandLandmark::PinkyPip,
        }
    }

    /// Fingertip
    #[must_use]
    pub const fn tip(self) -> HandLandmark {
        match self {
            Finger::Index => HandLandmark::IndexTip,
            Finger::Middle => HandLandmark::MiddleTip,
            Finger::Ring => HandLandmark::RingTip,
            Finger::Pinky => HandLandmark::PinkyTip,
        }
    }
}

/// A validated 21-landmark hand observation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl Observation {
    /// Create from a fixed-size landmark array
    #[inline]
    #[must_use]
    pub const fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { landmarks }
    }

    /// Landmark at an anatomical position
    #[inline]
    #[must_use]
    pub fn landmark(&self, joint: HandLandmark) -> &Landmark {
        &self.landmarks[joint.index()]
    }

    /// All landmarks in index order
    #[inline]
    #[must_use]
    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    /// Distance between two anatomical positions
    #[inline]
    #[must_use]
    pub fn distance(&self, a: HandLandmark, b: HandLandmark) -> f32 {
        self.landmark(a).distance(self.landmark(b))
    }

    /// Copy with every landmark shifted by `delta`
    #[must_use]
    pub fn translated(&self, delta: Landmark) -> Self {
        let mut landmarks = self.landmarks;
        for lm in &mut landmarks {
            *lm = lm.offset_by(&delta);
        }
        Self { landmarks }
    }

    /// Copy with one landmark replaced
    #[must_use]
    pub fn with_landmark(&self, joint: HandLandmark, value: Landmark) -> Self {
        let mut landmarks = self.landmarks;
        landmarks[joint.index()] = value;
        Self { landmarks }
    }
}

impl TryFrom<Vec<Landmark>> for Observation {
    type Error = ObservationError;

    fn try_from(value: Vec<Landmark>) -> Result<Self, Self::Error> {
        let found = value.len();
        <[Landmark; LANDMARK_COUNT]>::try_from(value)
            .map(Self::new)
            .map_err(|_| ObservationError::WrongLandmarkCount {
                expected: LANDMARK_COUNT,
                found,
            })
    }
}
