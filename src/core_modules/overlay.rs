// THEORY:
// The tracker never draws. It describes what a renderer should draw as a list of
// primitive shapes in frame coordinates, so any sink (an OpenCV window, a file
// writer, a test) can render or inspect them. Colors are plain RGB.

use crate::core_modules::navigator::NavigationState;
use crate::core_modules::smart_blob::{Blob, Point};
use image::Rgb;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CENTROID_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const TARGET_RING_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const TARGET_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
pub const GUIDE_COLOR: Rgb<u8> = Rgb([200, 200, 200]);
pub const DETECTED_LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const DIRECTION_LABEL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const NAVIGATE_LABEL_COLOR: Rgb<u8> = Rgb([255, 165, 0]);

const CENTROID_RADIUS: u32 = 7;
const TARGET_RING_WIDTH: u32 = 4;
const LABEL_X: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Filled,
    Outline(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Rectangle {
        top_left: Point,
        /// Exclusive corner.
        bottom_right: Point,
        color: Rgb<u8>,
        stroke: Stroke,
    },
    Circle {
        center: Point,
        radius: u32,
        color: Rgb<u8>,
        stroke: Stroke,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgb<u8>,
        thickness: u32,
    },
    /// `origin` is the bottom-left of the text baseline.
    Text {
        origin: Point,
        text: String,
        color: Rgb<u8>,
        scale: f32,
        thickness: u32,
    },
}

/// Everything the renderer needs to annotate one frame.
pub struct OverlayInputs<'a> {
    pub frame_size: (u32, u32),
    pub detection: Option<(&'a str, &'a Blob)>,
    pub direction: &'a str,
    pub navigation: &'a NavigationState,
    pub target: Point,
    pub target_radius: u32,
}

/// Builds the overlay list in back-to-front drawing order.
pub fn compose(inputs: &OverlayInputs<'_>) -> Vec<Overlay> {
    let (_, frame_height) = inputs.frame_size;
    let mut overlays = Vec::new();

    if let Some((_, blob)) = inputs.detection {
        let bbox = blob.bounding_box;
        overlays.push(Overlay::Rectangle {
            top_left: bbox.top_left(),
            bottom_right: bbox.bottom_right(),
            color: BOX_COLOR,
            stroke: Stroke::Outline(3),
        });
        overlays.push(Overlay::Circle {
            center: blob.centroid,
            radius: CENTROID_RADIUS,
            color: CENTROID_COLOR,
            stroke: Stroke::Filled,
        });
        overlays.push(Overlay::Line {
            from: Point::new(blob.centroid.x, 0),
            to: Point::new(blob.centroid.x, frame_height),
            color: CENTROID_COLOR,
            thickness: 2,
        });
    }

    overlays.push(Overlay::Circle {
        center: inputs.target,
        radius: inputs.target_radius + TARGET_RING_WIDTH,
        color: TARGET_RING_COLOR,
        stroke: Stroke::Filled,
    });
    overlays.push(Overlay::Circle {
        center: inputs.target,
        radius: inputs.target_radius,
        color: TARGET_COLOR,
        stroke: Stroke::Filled,
    });

    if let (Some((_, blob)), Some(distance)) = (inputs.detection, inputs.navigation.distance) {
        overlays.push(Overlay::Line {
            from: blob.centroid,
            to: inputs.target,
            color: GUIDE_COLOR,
            thickness: 2,
        });
        overlays.push(label(140, format!("Dist: {distance}px"), GUIDE_COLOR, 0.8, 2));
    }

    if let Some((color_name, _)) = inputs.detection {
        overlays.push(label(
            100,
            format!("Detected: {color_name}"),
            DETECTED_LABEL_COLOR,
            1.0,
            3,
        ));
    }

    overlays.push(label(
        50,
        format!("Direction: {}", inputs.direction),
        DIRECTION_LABEL_COLOR,
        1.0,
        3,
    ));
    overlays.push(label(
        frame_height.saturating_sub(40),
        format!("Navigate: {}", inputs.navigation.instruction),
        NAVIGATE_LABEL_COLOR,
        0.9,
        3,
    ));

    overlays
}

fn label(y: u32, text: String, color: Rgb<u8>, scale: f32, thickness: u32) -> Overlay {
    Overlay::Text {
        origin: Point::new(LABEL_X, y),
        text,
        color,
        scale,
        thickness,
    }
}
