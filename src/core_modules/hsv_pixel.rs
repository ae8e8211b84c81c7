// THEORY (HSV Pixel):
// The classifier never looks at raw RGB. Every frame is first re-expressed as
// hue / saturation / value, because a colored object keeps its hue when the light
// on it changes while its RGB channels all move together.
//
// The numeric scale is the 8-bit convention most color tables are written in:
// - hue:        degrees / 2, so the color wheel fits in [0, 180]
// - saturation: chroma / value, scaled to [0, 255]
// - value:      the brightest channel, [0, 255]
//
// Red sits on both ends of the hue scale, which is why a color may need more than
// one range (see `color_classifier`).
//
// Key principles:
// 1) Single-pixel scope: conversion never reads neighbours.
// 2) One conversion per frame: the orchestrator converts once and every color
//    is tested against the same `HsvImage`.

pub mod pixel {
    use crate::error::{Result, TrackerError};
    use image::{Rgb, RgbImage};
    use serde::{Deserialize, Serialize};

    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;

    /// Largest hue the 8-bit scale can produce.
    pub const HUE_MAX: Hue = 180;

    /// A single pixel in the perceptual color space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Hsv {
        /// Hue in half-degrees, [0, 180].
        pub h: Hue,
        /// Saturation, [0, 255].
        pub s: Saturation,
        /// Value (brightness), [0, 255].
        pub v: Value,
    }

    impl Hsv {
        pub const fn new(h: Hue, s: Saturation, v: Value) -> Self {
            Self { h, s, v }
        }

        /// Hue angle computed from normalized channels, then halved onto the 8-bit scale.
        pub fn from_rgb(pixel: &Rgb<u8>) -> Self {
            let [red, green, blue] = pixel.0;
            let maximum_channel = red.max(green).max(blue);
            let minimum_channel = red.min(green).min(blue);
            let chroma = (maximum_channel - minimum_channel) as f32;

            let value = maximum_channel;
            let saturation = if maximum_channel == 0 {
                0
            } else {
                (255.0 * chroma / maximum_channel as f32).round() as u8
            };

            if chroma <= 0.0 {
                return Self::new(0, saturation, value);
            }

            let (red, green, blue) = (red as f32, green as f32, blue as f32);
            let (base_difference, sector_offset) = if maximum_channel as f32 == red {
                (green - blue, 0.0)
            } else if maximum_channel as f32 == green {
                (blue - red, 120.0)
            } else {
                (red - green, 240.0)
            };

            let mut hue_degrees = 60.0 * base_difference / chroma + sector_offset;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            let hue = (hue_degrees / 2.0).round().min(HUE_MAX as f32) as u8;

            Self::new(hue, saturation, value)
        }
    }

    /// A frame re-expressed in HSV. Same dimensions as the source frame.
    #[derive(Debug, Clone)]
    pub struct HsvImage {
        width: u32,
        height: u32,
        pixels: Vec<Hsv>,
    }

    impl HsvImage {
        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        /// Pixels in row-major order.
        pub fn pixels(&self) -> &[Hsv] {
            &self.pixels
        }

        /// `None` outside the image.
        pub fn get(&self, x: u32, y: u32) -> Option<Hsv> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels.get(y as usize * self.width as usize + x as usize).copied()
        }
    }

    /// Converts a whole frame. A frame without pixels cannot be classified and is rejected.
    pub fn to_hsv(frame: &RgbImage) -> Result<HsvImage> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(TrackerError::InvalidFrame { width, height });
        }

        let pixels = frame.pixels().map(Hsv::from_rgb).collect();
        Ok(HsvImage { width, height, pixels })
    }
}
