use serde::{Deserialize, Serialize};

/// Integer face bounding box in source-image coordinates.
///
/// Signed so that boxes nudged past an edge by alignment or expansion stay
/// representable; the detector backend clamps before cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacialArea {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Interleaved 3-channel ordering of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    /// OpenCV / ArcFace preprocessing convention. The extractor requests
    /// this from the detector so crops match what the embedder expects.
    Bgr,
}

/// Raw pixel payload as produced by a detector backend.
///
/// Backends may hand back either 8-bit pixels or floats (unit-scaled or
/// 0–255); [`PixelBuffer::normalized_u8`] folds both into the 8-bit form
/// that gets written to disk.
#[derive(Debug, Clone)]
pub enum PixelData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

/// A 3-channel interleaved pixel buffer with an explicit channel order.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
    pub data: PixelData,
}

/// One detected face: its cropped pixels plus the box it came from.
///
/// Transient — lives only within one extractor invocation. Its durable
/// trace is the crop file and the box encoded in the crop's filename.
#[derive(Debug, Clone)]
pub struct FaceRegion {
    pub face: PixelBuffer,
    pub facial_area: FacialArea,
}

/// Per-image options forwarded to the detector backend.
#[derive(Debug, Clone, Copy)]
pub struct DetectionOptions {
    /// Rotate each crop so the eye line is horizontal.
    pub align: bool,
    /// Grow each detected box by this percentage before cropping.
    pub expand_percentage: u32,
    /// Channel ordering of the returned crop pixels.
    pub color: ChannelOrder,
    /// Treat "no face found" as an error instead of an empty result.
    pub enforce_detection: bool,
    /// When set, the backend scales pixels to [0, 1] floats itself. The
    /// extractor keeps this off and owns normalization (see [`crate::pixel`]).
    pub normalize: bool,
}

/// Embedding vector for one face (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

/// One entry of the embeddings artifact: a crop path and its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub image_path: String,
    pub embedding: Vec<f32>,
}
