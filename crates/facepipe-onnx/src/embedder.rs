//! ArcFace face embedder via ONNX Runtime.
//!
//! Maps a pre-aligned face crop to a 512-dimensional L2-normalized
//! embedding using the w600k_r50 ArcFace model. Detection is never
//! attempted here; crops are taken as-is and resized to the model input.

use facepipe_core::{Embedding, FaceEmbedder, PipelineError};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_INPUT_SIZE: usize = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // NOT 128.0 — ArcFace uses symmetric normalization
const ARCFACE_EMBEDDING_DIM: usize = 512;
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0} — download from insightface and place in the model dir")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

impl From<EmbedderError> for PipelineError {
    fn from(err: EmbedderError) -> Self {
        PipelineError::Backend(err.to_string())
    }
}

/// ArcFace-based face embedder.
pub struct ArcFaceEmbedder {
    session: Session,
}

impl ArcFaceEmbedder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, EmbedderError> {
        if !model_path.exists() {
            return Err(EmbedderError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Run the model on one crop, returning the L2-normalized vector.
    fn embed_image(&mut self, crop: &RgbImage) -> Result<Vec<f32>, EmbedderError> {
        let input = preprocess(crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        let raw: Vec<f32> = raw_data.to_vec();

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw
        };

        Ok(values)
    }
}

impl FaceEmbedder for ArcFaceEmbedder {
    fn represent(
        &mut self,
        image: &Path,
        enforce_detection: bool,
    ) -> Result<Vec<Embedding>, PipelineError> {
        let crop = match image::open(image) {
            Ok(img) => img.to_rgb8(),
            Err(err) if !enforce_detection => {
                tracing::warn!(crop = %image.display(), error = %err, "unreadable crop");
                return Ok(Vec::new());
            }
            Err(err) => {
                tracing::error!(crop = %image.display(), error = %err, "unreadable crop");
                return Err(PipelineError::Unprocessable(image.to_path_buf()));
            }
        };

        let values = self.embed_image(&crop)?;
        Ok(vec![Embedding {
            values,
            model_version: Some(ARCFACE_MODEL_VERSION.to_string()),
        }])
    }
}

/// Preprocess a crop into the model's NCHW float tensor: resize to
/// 112×112, normalize `(p - 127.5) / 127.5`, channels in BGR order (the
/// cv2 convention the model was exported under).
fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let size = ARCFACE_INPUT_SIZE;
    let resized = if crop.width() as usize == size && crop.height() as usize == size {
        crop.clone()
    } else {
        imageops::resize(crop, size as u32, size as u32, FilterType::Triangle)
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let px = resized.get_pixel(x as u32, y as u32).0;
            tensor[[0, 0, y, x]] = (px[2] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            tensor[[0, 1, y, x]] = (px[1] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            tensor[[0, 2, y, x]] = (px[0] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_output_shape() {
        let crop = RgbImage::from_pixel(112, 112, Rgb([128, 128, 128]));
        let tensor = preprocess(&crop);
        assert_eq!(tensor.shape(), &[1, 3, ARCFACE_INPUT_SIZE, ARCFACE_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let crop = RgbImage::from_pixel(112, 112, Rgb([128, 128, 128]));
        let tensor = preprocess(&crop);
        let expected = (128.0 - ARCFACE_MEAN) / ARCFACE_STD;
        let val = tensor[[0, 0, 0, 0]];
        assert!((val - expected).abs() < 1e-6, "got {val}, expected {expected}");
    }

    #[test]
    fn test_preprocess_channel_order_is_bgr() {
        // Pure red input: channel 0 of the tensor (blue) low, channel 2 (red) high.
        let crop = RgbImage::from_pixel(112, 112, Rgb([255, 0, 0]));
        let tensor = preprocess(&crop);
        assert!((tensor[[0, 0, 0, 0]] - (0.0 - ARCFACE_MEAN) / ARCFACE_STD).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 0]] - (255.0 - ARCFACE_MEAN) / ARCFACE_STD).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_resizes_odd_crops() {
        let crop = RgbImage::from_pixel(80, 90, Rgb([10, 20, 30]));
        let tensor = preprocess(&crop);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        // Uniform input stays uniform through the resize.
        let expected = (30.0 - ARCFACE_MEAN) / ARCFACE_STD;
        assert!((tensor[[0, 0, 56, 56]] - expected).abs() < 1e-4);
    }
}
