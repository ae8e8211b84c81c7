// THEORY:
// A `Blob` is the summary of one contiguous colored region in a single frame: where it
// is (bounding box), where its middle is (centroid) and how big it is (area in pixels).
// Like the other data containers in this crate it is "dumb": it carries no memory of
// earlier frames and knows nothing about targets or navigation.

use serde::{Deserialize, Serialize};

/// A 2D point in frame pixel coordinates. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box, top-left corner plus extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Box spanning two inclusive corners.
    pub fn from_corners(min: Point, max: Point) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x + 1,
            height: max.y - min.y + 1,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive bottom-right corner.
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Centre rounded down, the way the tracker reports it.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// The selected region for one color in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub bounding_box: BoundingBox,
    /// Centre of the bounding box.
    pub centroid: Point,
    /// Pixels enclosed by the region's outer boundary.
    pub area: u32,
}
