//! Pointer picking on the rendered field

use serde::{Deserialize, Serialize};

use crate::sample::Window;

/// Primary (left) mouse button
pub const PRIMARY_BUTTON: u8 = 1;

/// Pointer press as delivered by the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub button: u8,
    /// Data-space coordinates, absent when the pointer is outside the axes
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Picked coordinate, rounded for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub x: f64,
    pub y: f64,
}

impl Pick {
    pub fn status_text(&self) -> String {
        format!("Coordinates: x = {:?}; y = {:?}", self.x, self.y)
    }
}

/// Map a pointer press to a data coordinate
///
/// Anything but a primary-button press inside `axes` yields `None`.
pub fn locate(event: &PointerEvent, axes: &Window) -> Option<Pick> {
    if event.button != PRIMARY_BUTTON {
        return None;
    }
    let (x, y) = (event.x?, event.y?);
    if !axes.contains(x, y) {
        return None;
    }
    Some(Pick { x: round3(x), y: round3(y) })
}

fn round3(v: f64) -> f64 {
    // Adding zero folds -0.0 into 0.0
    (v * 1000.0).round() / 1000.0 + 0.0
}
