//! Extraction pass: input images → normalized face-crop files.

use crate::error::PipelineError;
use crate::naming;
use crate::types::{ChannelOrder, DetectionOptions, FaceRegion};
use crate::walk;
use std::fs;
use std::path::{Path, PathBuf};

/// Face-detection backend.
///
/// Implementations locate faces in the image at `path`, align and crop
/// them per `opts`, and return the regions in their own order (typically
/// descending confidence); the pipeline does not re-sort. With
/// `opts.enforce_detection` set, finding nothing is an error; otherwise
/// it is an empty result.
pub trait FaceDetector {
    fn extract_faces(
        &mut self,
        image: &Path,
        opts: &DetectionOptions,
    ) -> Result<Vec<FaceRegion>, PipelineError>;
}

/// Caller-facing knobs of the extraction pass.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Abort the run on the first image with no detectable face.
    pub enforce_detection: bool,
    /// Margin added around each detected box, as a percentage of its size.
    pub expand_percentage: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { enforce_detection: false, expand_percentage: 0 }
    }
}

/// Walk `inputs`, detect faces in each image, and write one normalized
/// crop file per face into `output_dir`.
///
/// `output_dir` is created (with parents) if absent. Crop filenames follow
/// the [`naming`] encoding and mirror the source container format; a
/// colliding name from a previous run is overwritten, but stale crops are
/// never deleted. An image with zero faces writes nothing and, unless
/// `enforce_detection` is set, the run continues.
pub fn extract<D: FaceDetector>(
    detector: &mut D,
    inputs: &[PathBuf],
    output_dir: &Path,
    opts: &ExtractOptions,
) -> Result<(), PipelineError> {
    fs::create_dir_all(output_dir)?;

    for image_path in walk::iter_image_paths(inputs)? {
        let regions = detector.extract_faces(
            &image_path,
            &DetectionOptions {
                align: true,
                expand_percentage: opts.expand_percentage,
                color: ChannelOrder::Bgr,
                enforce_detection: opts.enforce_detection,
                normalize: false,
            },
        )?;
        tracing::debug!(image = %image_path.display(), faces = regions.len(), "detected faces");

        for (i, region) in regions.iter().enumerate() {
            let name = naming::crop_file_name(&image_path, i + 1, &region.facial_area);
            let out_path = output_dir.join(&name);
            region.face.to_rgb_image()?.save(&out_path)?;
            tracing::info!(crop = %out_path.display(), "wrote face crop");
        }
    }

    Ok(())
}
