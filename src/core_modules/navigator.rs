// THEORY:
// The `Navigator` converts "where the object is" and "where it should be" into a
// human-readable steering instruction. It is a pure function: the same centroid,
// target and threshold always give the same `NavigationState`. Reporting a reach
// to the `TargetManager` is the orchestrator's job, done once per frame.
//
// Offsets are measured target minus object, in screen coordinates (y grows down):
// a positive dx means the target is to the right, a positive dy means it is below.
// An axis only produces an instruction when its offset exceeds the reach threshold.

use crate::core_modules::smart_blob::Point;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Only the horizontal offset is outside the reach threshold.
    Horizontal(Horizontal),
    /// Only the vertical offset is outside the reach threshold.
    Vertical(Vertical),
    Both(Horizontal, Vertical),
    TargetReached,
    /// No object was detected this frame.
    NoObject,
}

impl fmt::Display for Horizontal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizontal::Left => f.write_str("Move Left"),
            Horizontal::Right => f.write_str("Move Right"),
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertical::Up => f.write_str("Move Up"),
            Vertical::Down => f.write_str("Move Down"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Horizontal(h) => write!(f, "{h}"),
            Instruction::Vertical(v) => write!(f, "{v}"),
            Instruction::Both(h, v) => write!(f, "{h} & {v}"),
            Instruction::TargetReached => f.write_str("Target Reached"),
            Instruction::NoObject => f.write_str("No object to navigate"),
        }
    }
}

/// Per-frame navigation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub instruction: Instruction,
    /// `(target.x - centroid.x, target.y - centroid.y)`, absent without an object.
    pub offset: Option<(i64, i64)>,
    /// Euclidean distance truncated to whole pixels, absent without an object.
    pub distance: Option<u32>,
}

impl NavigationState {
    pub fn no_object() -> Self {
        Self {
            instruction: Instruction::NoObject,
            offset: None,
            distance: None,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.instruction == Instruction::TargetReached
    }
}

pub fn navigate(centroid: Option<Point>, target: Point, reach_threshold: u32) -> NavigationState {
    let Some(centroid) = centroid else {
        return NavigationState::no_object();
    };

    let dx = target.x as i64 - centroid.x as i64;
    let dy = target.y as i64 - centroid.y as i64;
    let distance = ((dx * dx + dy * dy) as f64).sqrt() as u32;
    let threshold = reach_threshold as i64;

    let horizontal = (dx.abs() > threshold).then(|| {
        if dx > 0 {
            Horizontal::Right
        } else {
            Horizontal::Left
        }
    });
    let vertical = (dy.abs() > threshold).then(|| if dy > 0 { Vertical::Down } else { Vertical::Up });

    let instruction = match (horizontal, vertical) {
        (Some(h), Some(v)) => Instruction::Both(h, v),
        (Some(h), None) => Instruction::Horizontal(h),
        (None, Some(v)) => Instruction::Vertical(v),
        (None, None) => Instruction::TargetReached,
    };

    NavigationState {
        instruction,
        offset: Some((dx, dy)),
        distance: Some(distance),
    }
}
