// THEORY:
// This file is the entry point of the `robo_eye` library crate. The public face of the
// tracker is the `pipeline` module: a `Tracker` that turns raw frames into render
// packages, plus the `FrameSource` / `FrameSink` seams through which a camera and a
// display are plugged in. `config` and `error` carry the tunables and the failure
// taxonomy. The components of the per-frame pipeline live in `core_modules` and can
// be used on their own (e.g. to build a mask or pick a blob in isolation).

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use pipeline::{FrameSink, FrameSource, RenderPackage, SinkControl, Tracker, TrackerStats};
