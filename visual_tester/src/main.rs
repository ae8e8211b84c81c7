use anyhow::bail;
use clap::Parser;
use image::RgbImage;
use opencv::{
    core::{self, Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use robo_eye::pipeline::{Overlay, Stroke};
use robo_eye::{FrameSink, FrameSource, RenderPackage, SinkControl, Tracker, TrackerConfig, TrackerError};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const WINDOW: &str = "RoboEye - Multi-Color Tracking with Target";

#[derive(Debug, Parser)]
#[command(name = "visual_tester", about = "Live color tracking with a navigation target")]
struct Args {
    /// Camera index to open when no input file is given.
    #[arg(long, default_value_t = 0)]
    camera: i32,
    /// Read frames from a video file instead of a camera.
    #[arg(long)]
    input: Option<String>,
    /// Also write the annotated frames to this video file.
    #[arg(long)]
    output: Option<String>,
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Do not mirror camera frames.
    #[arg(long)]
    no_mirror: bool,
}

// --- Frame source: OpenCV capture, BGR Mat -> RGB image ---

struct CaptureSource {
    cap: VideoCapture,
    frame: Mat,
}

impl CaptureSource {
    fn open(args: &Args) -> anyhow::Result<Self> {
        let mut cap = match &args.input {
            Some(path) => VideoCapture::from_file(path, videoio::CAP_ANY)?,
            None => {
                let mut cap = VideoCapture::new(args.camera, videoio::CAP_ANY)?;
                cap.set(videoio::CAP_PROP_FRAME_WIDTH, 640.0)?;
                cap.set(videoio::CAP_PROP_FRAME_HEIGHT, 480.0)?;
                cap
            }
        };
        if !cap.is_opened()? {
            bail!("camera not accessible");
        }
        Ok(Self {
            cap,
            frame: Mat::default(),
        })
    }

    fn fps(&self) -> f64 {
        self.cap
            .get(videoio::CAP_PROP_FPS)
            .ok()
            .filter(|fps| *fps > 0.0)
            .unwrap_or(30.0)
    }

    fn to_rgb(frame: &Mat) -> opencv::Result<Option<RgbImage>> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let bytes = rgb.data_bytes()?.to_vec();
        Ok(RgbImage::from_raw(rgb.cols() as u32, rgb.rows() as u32, bytes))
    }
}

impl FrameSource for CaptureSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, TrackerError> {
        let unavailable = |e: opencv::Error| TrackerError::SourceUnavailable(e.to_string());
        if !self.cap.read(&mut self.frame).map_err(unavailable)? || self.frame.empty() {
            return Ok(None);
        }
        // An empty buffer still goes to the tracker, which rejects it as an invalid frame.
        Ok(Some(Self::to_rgb(&self.frame).map_err(unavailable)?.unwrap_or_default()))
    }
}

// --- Render sink: draw overlays, show window, optional video output ---

struct WindowSink {
    writer: Option<VideoWriter>,
}

fn scalar(color: image::Rgb<u8>) -> Scalar {
    let [r, g, b] = color.0;
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

fn point(p: robo_eye::pipeline::Point) -> Point {
    Point::new(p.x as i32, p.y as i32)
}

fn thickness(stroke: Stroke) -> i32 {
    match stroke {
        Stroke::Filled => imgproc::FILLED,
        Stroke::Outline(t) => t as i32,
    }
}

impl WindowSink {
    fn to_bgr(frame: &RgbImage) -> opencv::Result<Mat> {
        let mut rgb = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
        Ok(bgr)
    }

    fn draw(image: &mut Mat, overlays: &[Overlay]) -> opencv::Result<()> {
        for overlay in overlays {
            match overlay {
                Overlay::Rectangle {
                    top_left,
                    bottom_right,
                    color,
                    stroke,
                } => {
                    // OpenCV corners are inclusive.
                    let corner = Point::new(bottom_right.x as i32 - 1, bottom_right.y as i32 - 1);
                    imgproc::rectangle_points(
                        image,
                        point(*top_left),
                        corner,
                        scalar(*color),
                        thickness(*stroke),
                        imgproc::LINE_8,
                        0,
                    )?;
                }
                Overlay::Circle {
                    center,
                    radius,
                    color,
                    stroke,
                } => {
                    imgproc::circle(
                        image,
                        point(*center),
                        *radius as i32,
                        scalar(*color),
                        thickness(*stroke),
                        imgproc::LINE_8,
                        0,
                    )?;
                }
                Overlay::Line {
                    from,
                    to,
                    color,
                    thickness,
                } => {
                    imgproc::line(
                        image,
                        point(*from),
                        point(*to),
                        scalar(*color),
                        *thickness as i32,
                        imgproc::LINE_8,
                        0,
                    )?;
                }
                Overlay::Text {
                    origin,
                    text,
                    color,
                    scale,
                    thickness,
                } => {
                    imgproc::put_text(
                        image,
                        text,
                        point(*origin),
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        *scale as f64,
                        scalar(*color),
                        *thickness as i32,
                        imgproc::LINE_8,
                        false,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn show(&mut self, package: &RenderPackage) -> opencv::Result<SinkControl> {
        let mut output_frame = Self::to_bgr(&package.frame)?;
        Self::draw(&mut output_frame, &package.overlays)?;

        if let Some(writer) = self.writer.as_mut() {
            writer.write(&output_frame)?;
        }
        highgui::imshow(WINDOW, &output_frame)?;

        let key = highgui::wait_key(1)?;
        Ok(if key & 0xFF == 'q' as i32 {
            SinkControl::Quit
        } else {
            SinkControl::Continue
        })
    }
}

impl FrameSink for WindowSink {
    fn present(&mut self, package: &RenderPackage) -> Result<SinkControl, TrackerError> {
        self.show(package).map_err(|e| TrackerError::Sink(e.to_string()))
    }
}

/// Loads the tracker config. `--no-mirror` always wins. Otherwise a config file
/// decides, and without one live camera feeds are mirrored so the operator moves
/// in the direction they see.
fn load_config(args: &Args) -> anyhow::Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load_from_file(path)?,
        None => TrackerConfig {
            mirror: args.input.is_none(),
            ..TrackerConfig::default()
        },
    };
    if args.no_mirror {
        config.mirror = false;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = load_config(&args)?;

    let mut source = CaptureSource::open(&args)?;

    let writer = match &args.output {
        Some(path) => {
            let width = source.cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
            let height = source.cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            Some(VideoWriter::new(
                path,
                fourcc,
                source.fps(),
                core::Size::new(width, height),
                true,
            )?)
        }
        None => None,
    };
    let mut sink = WindowSink { writer };

    let tracker = Tracker::new(config)?;
    let result = tracker.run(&mut source, &mut sink);
    highgui::destroy_all_windows()?;

    match result {
        Ok(stats) => {
            info!(?stats, "session ended");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "tracking stopped");
            Err(err.into())
        }
    }
}
