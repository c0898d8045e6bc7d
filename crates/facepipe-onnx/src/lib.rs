//! facepipe-onnx — Real pipeline backends via ONNX Runtime.
//!
//! Implements the core collaborator traits with SCRFD (face detection,
//! `det_10g.onnx`) and ArcFace (face embedding, `w600k_r50.onnx`), both
//! running on CPU. Model files are not bundled; download them from the
//! insightface model zoo and point the CLI's `--model-dir` at them.

pub mod alignment;
pub mod detector;
pub mod embedder;

pub use detector::ScrfdDetector;
pub use embedder::ArcFaceEmbedder;

use std::path::{Path, PathBuf};

/// Path to the SCRFD detection model inside a model directory.
pub fn scrfd_model_path(model_dir: &Path) -> PathBuf {
    model_dir.join("det_10g.onnx")
}

/// Path to the ArcFace embedding model inside a model directory.
pub fn arcface_model_path(model_dir: &Path) -> PathBuf {
    model_dir.join("w600k_r50.onnx")
}
