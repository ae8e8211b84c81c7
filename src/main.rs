// Headless runner: replays a directory of still images through the tracker as if
// they were camera frames, logging every render package and optionally writing the
// annotated frames out as PNGs. Text labels are logged rather than rasterised.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageFormat, Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use robo_eye::core_modules::clock::{Clock, SystemClock};
use robo_eye::pipeline::{Overlay, Point, Stroke};
use robo_eye::{FrameSink, FrameSource, RenderPackage, SinkControl, Tracker, TrackerConfig, TrackerError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "robo_eye", about = "Replay image frames through the color tracker")]
struct Args {
    /// Directory of frames, processed in file-name order.
    frames: PathBuf,
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Mirror frames horizontally before analysis.
    #[arg(long)]
    mirror: bool,
    /// Seed for target placement, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Write annotated frames to this directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

struct DirectorySource {
    paths: std::vec::IntoIter<PathBuf>,
    exhausted: bool,
}

impl DirectorySource {
    fn open(dir: &Path) -> Result<Self, TrackerError> {
        let mut paths = image_paths(dir)?;
        paths.sort();
        info!(count = paths.len(), dir = %dir.display(), "replaying frames");
        Ok(Self {
            paths: paths.into_iter(),
            exhausted: false,
        })
    }

    fn remaining(&self) -> usize {
        self.paths.len()
    }

    /// Every path has been handed out or skipped.
    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Files in `dir` whose extension names an image format.
fn image_paths(dir: &Path) -> Result<Vec<PathBuf>, TrackerError> {
    Ok(std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
        .collect())
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, TrackerError> {
        for path in self.paths.by_ref() {
            match image::open(&path) {
                Ok(frame) => return Ok(Some(frame.to_rgb8())),
                // A frame that fails to decode is dropped, like a bad camera read.
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable frame"),
            }
        }
        self.exhausted = true;
        Ok(None)
    }
}

struct ReplaySink {
    out_dir: Option<PathBuf>,
    index: usize,
    /// Quit once this many frames have been presented.
    total: usize,
}

impl FrameSink for ReplaySink {
    fn present(&mut self, package: &RenderPackage) -> Result<SinkControl, TrackerError> {
        info!(
            frame = self.index,
            color = package.detection.as_ref().map(|d| d.color.as_str()).unwrap_or("-"),
            direction = %package.direction,
            navigate = %package.navigation.instruction,
            distance = ?package.navigation.distance,
            target_x = package.target.x,
            target_y = package.target.y,
            "frame"
        );

        if let Some(dir) = &self.out_dir {
            let mut frame = package.frame.clone();
            draw_overlays(&mut frame, &package.overlays);
            save_png(&dir.join(format!("frame_{:05}.png", self.index)), &frame)?;
        }

        self.index += 1;
        Ok(if self.index >= self.total {
            SinkControl::Quit
        } else {
            SinkControl::Continue
        })
    }
}

fn save_png(path: &Path, frame: &RgbImage) -> Result<(), TrackerError> {
    let output = File::create(path)?;
    let encoder = PngEncoder::new(output);
    encoder.write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(())
}

fn put(frame: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, color);
    }
}

fn disc(frame: &mut RgbImage, center: (i64, i64), radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(frame, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}

fn line(frame: &mut RgbImage, from: Point, to: Point, thickness: u32, color: Rgb<u8>) {
    let (mut x, mut y) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = (thickness / 2) as i64;

    loop {
        disc(frame, (x, y), half, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_overlays(frame: &mut RgbImage, overlays: &[Overlay]) {
    for overlay in overlays {
        match overlay {
            Overlay::Rectangle {
                top_left,
                bottom_right,
                color,
                stroke,
            } => {
                let (x0, y0) = (top_left.x as i64, top_left.y as i64);
                let (x1, y1) = (bottom_right.x as i64 - 1, bottom_right.y as i64 - 1);
                let width = match stroke {
                    Stroke::Filled => i64::MAX,
                    Stroke::Outline(t) => *t as i64,
                };
                for y in y0..=y1 {
                    for x in x0..=x1 {
                        let edge = (x - x0).min(x1 - x).min(y - y0).min(y1 - y);
                        if edge < width {
                            put(frame, x, y, *color);
                        }
                    }
                }
            }
            Overlay::Circle {
                center,
                radius,
                color,
                stroke: _,
            } => disc(frame, (center.x as i64, center.y as i64), *radius as i64, *color),
            Overlay::Line {
                from,
                to,
                color,
                thickness,
            } => line(frame, *from, *to, *thickness, *color),
            Overlay::Text { .. } => {}
        }
    }
}

fn replay<R: Rng, C: Clock>(
    tracker: Tracker<R, C>,
    source: &mut DirectorySource,
    sink: &mut ReplaySink,
) -> Result<(), TrackerError> {
    match tracker.run(source, sink) {
        Ok(stats) => info!(?stats, "done"),
        // Skipped frames leave the sink short of its count; a drained directory is
        // still a complete replay.
        Err(TrackerError::SourceUnavailable(_)) if source.is_exhausted() => {
            info!(presented = sink.index, "replay finished")
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    config.mirror |= args.mirror;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let tracker = Tracker::with_parts(config, rng, SystemClock)?;

    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut source = DirectorySource::open(&args.frames)?;
    let mut sink = ReplaySink {
        out_dir: args.out.clone(),
        index: 0,
        total: source.remaining(),
    };

    replay(tracker, &mut source, &mut sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use robo_eye::core_modules::clock::ManualClock;

    fn write_frame(dir: &Path, name: &str, frame: &RgbImage) {
        save_png(&dir.join(name), frame).expect("frame written");
    }

    fn tracker() -> Tracker<StdRng, ManualClock> {
        Tracker::with_parts(
            TrackerConfig::default(),
            StdRng::seed_from_u64(1),
            ManualClock::new(),
        )
        .expect("default config is valid")
    }

    fn sink_for(source: &DirectorySource) -> ReplaySink {
        ReplaySink {
            out_dir: None,
            index: 0,
            total: source.remaining(),
        }
    }

    #[test]
    fn only_image_files_are_replayed() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_frame(dir.path(), "frame_0.png", &RgbImage::new(64, 48));
        std::fs::write(dir.path().join("notes.txt"), "not a frame").expect("written");
        std::fs::create_dir(dir.path().join("nested.png")).expect("created");

        let mut source = DirectorySource::open(dir.path()).expect("readable dir");
        assert_eq!(source.remaining(), 1);
        assert!(source.next_frame().expect("frame").is_some());
        assert!(source.next_frame().expect("end").is_none());
        assert!(source.is_exhausted());
    }

    #[test]
    fn all_frames_presented_is_a_clean_finish() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_frame(dir.path(), "a.png", &RgbImage::new(64, 48));
        write_frame(dir.path(), "b.png", &RgbImage::new(64, 48));

        let mut source = DirectorySource::open(dir.path()).expect("readable dir");
        let mut sink = sink_for(&source);
        replay(tracker(), &mut source, &mut sink).expect("clean replay");
        assert_eq!(sink.index, 2);
    }

    #[test]
    fn undecodable_frame_is_skipped_and_replay_still_finishes() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_frame(dir.path(), "a.png", &RgbImage::new(64, 48));
        std::fs::write(dir.path().join("b.png"), b"truncated").expect("written");
        write_frame(dir.path(), "c.png", &RgbImage::new(64, 48));

        let mut source = DirectorySource::open(dir.path()).expect("readable dir");
        let mut sink = sink_for(&source);
        assert_eq!(sink.total, 3);
        replay(tracker(), &mut source, &mut sink).expect("clean replay");
        assert_eq!(sink.index, 2);
        assert!(source.is_exhausted());
    }

    #[test]
    fn empty_directory_is_a_clean_finish() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut source = DirectorySource::open(dir.path()).expect("readable dir");
        let mut sink = sink_for(&source);
        replay(tracker(), &mut source, &mut sink).expect("clean replay");
        assert_eq!(sink.index, 0);
    }
}
