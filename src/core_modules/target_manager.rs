// THEORY:
// The `TargetManager` owns the only piece of state that survives between frames: the
// on-screen point the tracked object is being guided to, and the time the last reach
// was registered.
//
// Lifecycle:
// - **Uninitialized**: no frame has been seen, so no target can be placed.
// - **Active**: the first known frame size produces a random target inside the frame
//   inset by `margin` on every side.
// - **Active (replaced)**: when the navigator reports a reach *and* more than
//   `cooldown` has passed since the last registered reach, the timestamp is moved to
//   now and only then is a new random target drawn. Reach reports that arrive inside
//   the cooldown window leave both the target and the timestamp untouched.
//
// Randomness and time are both passed in, so target sequences are reproducible with
// a seeded RNG and a manual clock.

use crate::core_modules::smart_blob::Point;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happened to a reach report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachOutcome {
    /// Cooldown had elapsed; the target moved.
    Replaced { previous: Point, next: Point },
    /// Still inside the cooldown window (or no target placed yet); nothing changed.
    CoolingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    Uninitialized,
    Active(Point),
}

#[derive(Debug, Clone)]
pub struct TargetManager {
    state: TargetState,
    /// Frame size the current target was placed for.
    frame_size: Option<(u32, u32)>,
    margin: u32,
    cooldown: Duration,
    last_reach: Option<Instant>,
    /// Every reach report received, whether or not it replaced the target.
    reach_reports: u64,
    /// Targets that were reached and replaced.
    targets_reached: u64,
}

/// Uniform point in `[margin, w - margin] x [margin, h - margin]`.
/// An axis too short for the inset collapses to its centre.
pub fn random_target<R: Rng>(rng: &mut R, width: u32, height: u32, margin: u32) -> Point {
    fn axis<R: Rng>(rng: &mut R, len: u32, margin: u32) -> u32 {
        if len / 2 >= margin {
            rng.random_range(margin..=len - margin)
        } else {
            len / 2
        }
    }
    let x = axis(rng, width, margin);
    let y = axis(rng, height, margin);
    Point::new(x, y)
}

impl TargetManager {
    pub fn new(margin: u32, cooldown: Duration) -> Self {
        Self {
            state: TargetState::Uninitialized,
            frame_size: None,
            margin,
            cooldown,
            last_reach: None,
            reach_reports: 0,
            targets_reached: 0,
        }
    }

    pub fn target(&self) -> Option<Point> {
        match self.state {
            TargetState::Uninitialized => None,
            TargetState::Active(target) => Some(target),
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, TargetState::Active(_))
    }

    pub fn reach_reports(&self) -> u64 {
        self.reach_reports
    }

    pub fn targets_reached(&self) -> u64 {
        self.targets_reached
    }

    pub fn last_reach(&self) -> Option<Instant> {
        self.last_reach
    }

    /// Places a target explicitly. Frame size handling is unchanged.
    pub fn pin(&mut self, target: Point) {
        debug!(x = target.x, y = target.y, "target pinned");
        self.state = TargetState::Active(target);
    }

    /// Makes sure a target exists for a frame of the given size and returns it.
    ///
    /// The first size seen initializes the manager. A later, different size is not
    /// expected from a camera; it is adopted and the target is re-drawn for it.
    pub fn ensure_target<R: Rng>(&mut self, width: u32, height: u32, rng: &mut R) -> Point {
        match self.frame_size {
            Some(size) if size == (width, height) => {}
            Some((old_width, old_height)) => {
                warn!(
                    old_width,
                    old_height, width, height, "frame size changed, re-drawing target"
                );
                self.frame_size = Some((width, height));
                self.place_new_target(rng);
            }
            None => self.frame_size = Some((width, height)),
        }

        match self.state {
            TargetState::Active(target) => target,
            TargetState::Uninitialized => self.place_new_target(rng),
        }
    }

    /// Handles a "Target Reached" report from the navigator.
    pub fn register_reach<R: Rng>(&mut self, now: Instant, rng: &mut R) -> ReachOutcome {
        self.reach_reports += 1;

        let cooled_down = match self.last_reach {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
        };
        let previous = match (self.state, cooled_down, self.frame_size) {
            (TargetState::Active(previous), true, Some(_)) => previous,
            _ => return ReachOutcome::CoolingDown,
        };

        // The timestamp moves before the new target exists.
        self.last_reach = Some(now);
        let next = self.place_new_target(rng);
        self.targets_reached += 1;

        ReachOutcome::Replaced { previous, next }
    }

    fn place_new_target<R: Rng>(&mut self, rng: &mut R) -> Point {
        let (width, height) = self.frame_size.unwrap_or_default();
        let target = random_target(rng, width, height, self.margin);
        info!(x = target.x, y = target.y, "new target");
        self.state = TargetState::Active(target);
        target
    }
}
