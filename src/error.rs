// THEORY:
// Every failure the tracker can report is collected in one enum. Only two of them
// matter at runtime: `InvalidFrame` costs us a single frame, `SourceUnavailable`
// ends the run. "Nothing detected" is a normal outcome and is expressed as `None`
// by the components, never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The frame has no pixels to analyse. The current cycle is skipped.
    #[error("invalid frame: {width}x{height} has no pixels")]
    InvalidFrame { width: u32, height: u32 },

    /// The frame source cannot produce any more frames. Fatal for the run loop.
    #[error("camera unavailable: {0}")]
    SourceUnavailable(String),

    /// The render sink failed to present a frame.
    #[error("render sink failed: {0}")]
    Sink(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
