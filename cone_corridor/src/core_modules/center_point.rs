// THEORY:
// A `CenterPoint` is the only thing the spatial layer hands to the geometric
// layer. Everything else about a blob (its pixels, its moments, its bounding
// box) is discarded once the centroid is known, so later stages work with a
// short list of coordinates rather than with the mask.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The integer pixel coordinate of a blob's centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CenterPoint {
    pub x: u32,
    pub y: u32,
}

impl CenterPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for CenterPoint {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CenterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
