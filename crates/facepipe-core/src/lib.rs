//! facepipe-core — Deterministic face-crop extraction and embedding collection.
//!
//! Two filesystem passes that compose through a crops directory: the
//! extractor walks input images, asks a [`FaceDetector`] for aligned face
//! regions, and writes each as a crop file whose name encodes the source
//! image and bounding box; the embedder walks a crops directory, asks a
//! [`FaceEmbedder`] for a vector per crop, and serializes the results as
//! one JSON artifact. Both backends are traits so the pipeline can run
//! against scripted stubs in tests.

pub mod embed;
pub mod error;
pub mod extract;
pub mod naming;
pub mod pixel;
pub mod types;
pub mod walk;

pub use embed::{embed, FaceEmbedder};
pub use error::PipelineError;
pub use extract::{extract, ExtractOptions, FaceDetector};
pub use types::{
    ChannelOrder, DetectionOptions, Embedding, EmbeddingRecord, FaceRegion, FacialArea,
    PixelBuffer, PixelData,
};
