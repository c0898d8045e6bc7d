use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the extraction and embedding passes.
///
/// `NoFaceDetected` and `Unprocessable` are only produced in strict mode
/// (`enforce_detection = true`); in tolerant mode the same conditions yield
/// an empty result and the run continues. Everything else is fatal in both
/// modes.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no face detected in {0}")]
    NoFaceDetected(PathBuf),
    #[error("cannot process {0}")]
    Unprocessable(PathBuf),
    #[error("pixel buffer {width}x{height} does not match data length {len}")]
    MalformedBuffer { width: u32, height: u32, len: usize },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend: {0}")]
    Backend(String),
}
