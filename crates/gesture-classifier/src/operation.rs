//! Gesture to editing-operation mapping
//!
//! A static table consulted after classification. Labels without an entry
//! (currently only `unknown`) map to no operation.

use crate::label::GestureLabel;
use serde::Serialize;

/// Parameterised editing operation triggered by a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationMapping {
    /// Operation name understood by the editing application
    pub operation: &'static str,
    /// Ordered parameter names the client should supply
    pub parameters: &'static [&'static str],
}

/// Label to operation table
pub static OPERATION_TABLE: [(GestureLabel, OperationMapping); 7] = [
    (
        GestureLabel::Pinch,
        OperationMapping {
            operation: "scale",
            parameters: &["thumb_index_distance"],
        },
    ),
    (
        GestureLabel::Point,
        OperationMapping {
            operation: "select_vertex",
            parameters: &["index_tip_x", "index_tip_y"],
        },
    ),
    (
        GestureLabel::Spread,
        OperationMapping {
            operation: "adjust_angle",
            parameters: &["finger_spread_angle"],
        },
    ),
    (
        GestureLabel::Grab,
        OperationMapping {
            operation: "translate",
            parameters: &["palm_center_x", "palm_center_y"],
        },
    ),
    (
        GestureLabel::Draw,
        OperationMapping {
            operation: "draw_path",
            parameters: &["index_trajectory"],
        },
    ),
    (
        GestureLabel::Rotate,
        OperationMapping {
            operation: "rotate",
            parameters: &["wrist_angle"],
        },
    ),
    (
        GestureLabel::Erase,
        OperationMapping {
            operation: "erase",
            parameters: &["palm_center_x", "palm_center_y"],
        },
    ),
];

/// Look up the operation for a label
#[must_use]
pub fn math_operation(label: GestureLabel) -> Option<&'static OperationMapping> {
    OPERATION_TABLE
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, mapping)| mapping)
}

/// Operation names advertised to clients
#[must_use]
pub fn operation_names() -> Vec<&'static str> {
    OPERATION_TABLE.iter().map(|(_, m)| m.operation).collect()
}
