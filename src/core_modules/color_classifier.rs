// THEORY:
// The `ColorClassifier` is the first spatial stage of the tracker. Given an HSV frame
// and one `ColorSpec`, it answers a yes/no question for every pixel: "is this pixel
// the named color?" The answer is a binary `Mask` with the frame's dimensions.
//
// A color is described by one or more inclusive (lower, upper) HSV boxes. The mask
// is the union of the per-box masks, which lets a color like red claim both ends of
// the hue scale. Colors are independent of each other: a pixel may belong to several
// colors' masks, and the orchestrator decides which color wins.

use crate::core_modules::hsv_pixel::pixel::{Hsv, HsvImage, to_hsv};
use crate::error::Result;
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Binary presence map. Foreground pixels are `FOREGROUND`, everything else is 0.
pub type Mask = GrayImage;

pub const FOREGROUND: u8 = 255;

/// One inclusive box in HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, pixel: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&pixel.h)
            && (self.lower.s..=self.upper.s).contains(&pixel.s)
            && (self.lower.v..=self.upper.v).contains(&pixel.v)
    }

    /// A range whose lower bound exceeds its upper bound on any channel can never match.
    pub fn is_well_formed(&self) -> bool {
        self.lower.h <= self.upper.h && self.lower.s <= self.upper.s && self.lower.v <= self.upper.v
    }
}

/// A named color and the HSV boxes that make it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSpec {
    pub name: String,
    pub ranges: Vec<HsvRange>,
}

impl ColorSpec {
    pub fn new(name: impl Into<String>, ranges: Vec<HsvRange>) -> Self {
        Self {
            name: name.into(),
            ranges,
        }
    }

    pub fn matches(&self, pixel: Hsv) -> bool {
        self.ranges.iter().any(|range| range.contains(pixel))
    }
}

/// The built-in color table, in search order.
pub fn default_colors() -> Vec<ColorSpec> {
    let range = |lower: (u8, u8, u8), upper: (u8, u8, u8)| {
        HsvRange::new(
            Hsv::new(lower.0, lower.1, lower.2),
            Hsv::new(upper.0, upper.1, upper.2),
        )
    };

    vec![
        ColorSpec::new(
            "Red",
            vec![
                range((0, 120, 70), (10, 255, 255)),
                range((170, 120, 70), (180, 255, 255)),
            ],
        ),
        ColorSpec::new("Blue", vec![range((94, 80, 2), (126, 255, 255))]),
        ColorSpec::new("Green", vec![range((35, 100, 100), (85, 255, 255))]),
        ColorSpec::new("Yellow", vec![range((20, 100, 100), (30, 255, 255))]),
    ]
}

/// Builds the mask for one color from an already converted frame.
pub fn build_mask(hsv: &HsvImage, color: &ColorSpec) -> Mask {
    let (width, height) = hsv.dimensions();
    let mut mask = Mask::new(width, height);
    for (pixel, out) in hsv.pixels().iter().zip(mask.pixels_mut()) {
        if color.matches(*pixel) {
            *out = Luma([FOREGROUND]);
        }
    }
    mask
}

/// Convenience entry point for a single color on a raw frame.
pub fn classify(frame: &RgbImage, color: &ColorSpec) -> Result<Mask> {
    let hsv = to_hsv(frame)?;
    Ok(build_mask(&hsv, color))
}
