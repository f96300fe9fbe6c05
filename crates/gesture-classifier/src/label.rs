//! Gesture vocabulary

use crate::error::ClassifierError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete gesture labels (order matches trained artifacts)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    /// Thumb and index tips together
    Pinch,
    /// Index extended, other fingers curled
    Point,
    /// All fingers extended
    Spread,
    /// Closed fist
    Grab,
    /// Index tracing a path
    Draw,
    /// Wrist rotation
    Rotate,
    /// Flat-palm wipe
    Erase,
    /// Nothing recognised
    Unknown,
}

impl GestureLabel {
    /// Full vocabulary in artifact order
    pub const ALL: [GestureLabel; 8] = [
        GestureLabel::Pinch,
        GestureLabel::Point,
        GestureLabel::Spread,
        GestureLabel::Grab,
        GestureLabel::Draw,
        GestureLabel::Rotate,
        GestureLabel::Erase,
        GestureLabel::Unknown,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GestureLabel::Pinch => "pinch",
            GestureLabel::Point => "point",
            GestureLabel::Spread => "spread",
            GestureLabel::Grab => "grab",
            GestureLabel::Draw => "draw",
            GestureLabel::Rotate => "rotate",
            GestureLabel::Erase => "erase",
            GestureLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureLabel {
    type Err = ClassifierError;

    /// Case-insensitive; `none` is accepted as an alias for `unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "none" {
            return Ok(GestureLabel::Unknown);
        }
        GestureLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == lowered)
            .ok_or_else(|| ClassifierError::UnknownLabel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("PINCH".parse::<GestureLabel>().unwrap(), GestureLabel::Pinch);
        assert_eq!(" spread ".parse::<GestureLabel>().unwrap(), GestureLabel::Spread);
        assert_eq!("NONE".parse::<GestureLabel>().unwrap(), GestureLabel::Unknown);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(matches!(
            "wave".parse::<GestureLabel>(),
            Err(ClassifierError::UnknownLabel(name)) if name == "wave"
        ));
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&GestureLabel::Grab).unwrap(), "\"grab\"");
        for label in GestureLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{label}\""));
        }
    }
}
