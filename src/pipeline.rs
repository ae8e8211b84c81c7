// THEORY:
// The `pipeline` module is the top-level API of the tracker. A `Tracker` owns all
// cross-frame state (the target manager, the RNG and the clock) and turns one raw frame
// into one `RenderPackage`:
//
// Stage 1: Color conversion. The frame is converted to HSV once. An empty frame stops
//          here with `InvalidFrame`.
// Stage 2: Target bookkeeping. The first frame fixes the frame size and places a target.
// Stage 3: Color search. Colors are tried in configured order; each is classified,
//          refined and reduced to its largest blob. The first accepted blob wins and
//          the remaining colors are not examined.
// Stage 4: Navigation. The blob centroid and the target give a steering instruction. A
//          reach is reported to the target manager exactly once for the frame.
// Stage 5: Packaging. The results and the overlay primitives describing them go to
//          the render sink.
//
// Frame acquisition and display live outside the crate behind `FrameSource` and
// `FrameSink`; `Tracker::run` drives them until the sink asks to quit or the source
// runs dry.

use crate::config::TrackerConfig;
use crate::core_modules::blob_detector::blob_detector::select_blob;
use crate::core_modules::clock::{Clock, SystemClock};
use crate::core_modules::color_classifier::{ColorSpec, build_mask};
use crate::core_modules::hsv_pixel::pixel::{HsvImage, to_hsv};
use crate::core_modules::mask_refiner::mask_refiner::{RefineSettings, refine};
use crate::core_modules::navigator::navigate;
use crate::core_modules::overlay::{self, OverlayInputs};
use crate::core_modules::target_manager::{ReachOutcome, TargetManager};
use crate::error::{Result, TrackerError};
use image::RgbImage;
use image::imageops::flip_horizontal_in_place;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use tracing::{debug, error, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::navigator::{Instruction, NavigationState};
pub use crate::core_modules::overlay::{Overlay, Stroke};
pub use crate::core_modules::smart_blob::{Blob, BoundingBox, Point};

/// Coarse position of the object in the frame, by thirds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Forward,
    Right,
    NoObject,
}

impl Direction {
    pub fn from_centroid(centroid: Point, frame_width: u32) -> Self {
        let cx = centroid.x as f64;
        let width = frame_width as f64;
        if cx < width / 3.0 {
            Direction::Left
        } else if cx > 2.0 * width / 3.0 {
            Direction::Right
        } else {
            Direction::Forward
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Left => "Move Left",
            Direction::Forward => "Move Forward",
            Direction::Right => "Move Right",
            Direction::NoObject => "No Object Detected",
        })
    }
}

/// The accepted blob of the frame and the color that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub color: String,
    pub blob: Blob,
}

/// The per-frame output handed to the render sink.
#[derive(Debug, Clone)]
pub struct RenderPackage {
    /// The analysed frame (mirrored if mirroring is enabled).
    pub frame: RgbImage,
    pub detection: Option<Detection>,
    pub direction: Direction,
    pub navigation: NavigationState,
    /// The target navigated toward in this frame.
    pub target: Point,
    /// Set when this frame's reach moved the target.
    pub next_target: Option<Point>,
    pub overlays: Vec<Overlay>,
}

/// Counters reported when the tracker shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub detections: u64,
    pub reach_reports: u64,
    pub targets_reached: u64,
}

/// Produces raw frames. `Ok(None)` means the stream has ended.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Quit,
}

/// Consumes annotated frames and owns the operator's quit signal.
pub trait FrameSink {
    fn present(&mut self, package: &RenderPackage) -> Result<SinkControl>;
}

/// Tries colors in order and returns the first accepted blob.
pub fn find_first_detection(
    hsv: &HsvImage,
    colors: &[ColorSpec],
    settings: &RefineSettings,
    min_area: u32,
) -> Option<Detection> {
    for color in colors {
        let mask = refine(&build_mask(hsv, color), settings);
        if let Some(blob) = select_blob(&mask, min_area) {
            return Some(Detection {
                color: color.name.clone(),
                blob,
            });
        }
    }
    None
}

pub struct Tracker<R = StdRng, C = SystemClock> {
    config: TrackerConfig,
    refine_settings: RefineSettings,
    targets: TargetManager,
    rng: R,
    clock: C,
    stats: TrackerStats,
}

impl Tracker {
    /// A tracker with an OS-seeded RNG and the system clock.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_parts(config, StdRng::from_os_rng(), SystemClock)
    }
}

impl<R: Rng, C: Clock> Tracker<R, C> {
    pub fn with_parts(config: TrackerConfig, rng: R, clock: C) -> Result<Self> {
        config.validate()?;
        let targets = TargetManager::new(config.target_margin, config.cooldown()?);
        Ok(Self {
            refine_settings: config.refine_settings(),
            config,
            targets,
            rng,
            clock,
            stats: TrackerStats::default(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn target_manager(&self) -> &TargetManager {
        &self.targets
    }

    /// Overrides the current target.
    pub fn pin_target(&mut self, target: Point) {
        self.targets.pin(target);
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            reach_reports: self.targets.reach_reports(),
            targets_reached: self.targets.targets_reached(),
            ..self.stats
        }
    }

    /// Runs the full pipeline on one frame.
    pub fn process(&mut self, mut frame: RgbImage) -> Result<RenderPackage> {
        if self.config.mirror {
            flip_horizontal_in_place(&mut frame);
        }

        // Stage 1
        let hsv = match to_hsv(&frame) {
            Ok(hsv) => hsv,
            Err(err) => {
                self.stats.frames_skipped += 1;
                return Err(err);
            }
        };
        let (width, height) = hsv.dimensions();

        // Stage 2
        let target = self.targets.ensure_target(width, height, &mut self.rng);

        // Stage 3
        let detection = find_first_detection(
            &hsv,
            &self.config.colors,
            &self.refine_settings,
            self.config.min_blob_area,
        );
        let direction = match &detection {
            Some(found) => {
                debug!(
                    color = %found.color,
                    cx = found.blob.centroid.x,
                    cy = found.blob.centroid.y,
                    area = found.blob.area,
                    "object detected"
                );
                Direction::from_centroid(found.blob.centroid, width)
            }
            None => Direction::NoObject,
        };

        // Stage 4
        let centroid = detection.as_ref().map(|found| found.blob.centroid);
        let navigation = navigate(centroid, target, self.config.reach_threshold);
        let next_target = if navigation.is_reached() {
            match self.targets.register_reach(self.clock.now(), &mut self.rng) {
                ReachOutcome::Replaced { next, .. } => Some(next),
                ReachOutcome::CoolingDown => None,
            }
        } else {
            None
        };

        // Stage 5
        let overlays = overlay::compose(&OverlayInputs {
            frame_size: (width, height),
            detection: detection
                .as_ref()
                .map(|found| (found.color.as_str(), &found.blob)),
            direction: &direction.to_string(),
            navigation: &navigation,
            target,
            target_radius: self.config.target_radius,
        });

        self.stats.frames_processed += 1;
        if detection.is_some() {
            self.stats.detections += 1;
        }

        Ok(RenderPackage {
            frame,
            detection,
            direction,
            navigation,
            target,
            next_target,
            overlays,
        })
    }

    /// Pulls frames from `source` and pushes packages to `sink` until the sink quits.
    ///
    /// Invalid frames are skipped. A source that ends or fails is fatal and is
    /// reported as `SourceUnavailable`.
    pub fn run<S, K>(mut self, source: &mut S, sink: &mut K) -> Result<TrackerStats>
    where
        S: FrameSource,
        K: FrameSink,
    {
        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    error!("frame source ended");
                    self.shutdown();
                    return Err(TrackerError::SourceUnavailable("end of stream".into()));
                }
                Err(err) => {
                    error!(error = %err, "frame source failed");
                    self.shutdown();
                    return Err(match err {
                        TrackerError::SourceUnavailable(_) => err,
                        other => TrackerError::SourceUnavailable(other.to_string()),
                    });
                }
            };

            let package = match self.process(frame) {
                Ok(package) => package,
                Err(err @ TrackerError::InvalidFrame { .. }) => {
                    warn!(error = %err, "skipping frame");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if sink.present(&package)? == SinkControl::Quit {
                info!("quit requested");
                return Ok(self.shutdown());
            }
        }
    }

    /// Ends the tracker's lifecycle and reports what it did.
    pub fn shutdown(self) -> TrackerStats {
        let stats = self.stats();
        info!(
            frames = stats.frames_processed,
            skipped = stats.frames_skipped,
            detections = stats.detections,
            targets_reached = stats.targets_reached,
            "tracker shut down"
        );
        stats
    }
}
