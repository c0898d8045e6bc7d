//! Embedding pass: face-crop directory → one JSON artifact.

use crate::error::PipelineError;
use crate::types::{Embedding, EmbeddingRecord};
use crate::walk;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Embedding backend.
///
/// Crops are assumed pre-aligned and pre-cropped by the extraction pass,
/// so implementations never re-detect. A crop the backend cannot process
/// yields an empty result in tolerant mode and an error when
/// `enforce_detection` is set. A non-empty result may contain several
/// sub-results; the pipeline keeps only the first.
pub trait FaceEmbedder {
    fn represent(
        &mut self,
        image: &Path,
        enforce_detection: bool,
    ) -> Result<Vec<Embedding>, PipelineError>;
}

/// Embed every crop in `faces_dir` (flat, lexicographic order) and write
/// the collected records to `output_path` as one pretty-printed JSON
/// array, overwriting whatever was there.
///
/// Record order equals directory order at embedding time. Crops for which
/// the backend returns nothing are skipped and contribute no record. The
/// records are also returned for callers that want them in memory.
pub fn embed<E: FaceEmbedder>(
    embedder: &mut E,
    faces_dir: &Path,
    output_path: &Path,
    enforce_detection: bool,
) -> Result<Vec<EmbeddingRecord>, PipelineError> {
    let mut records = Vec::new();

    for crop_path in walk::list_faces(faces_dir)? {
        let representation = embedder.represent(&crop_path, enforce_detection)?;
        let Some(first) = representation.into_iter().next() else {
            tracing::warn!(crop = %crop_path.display(), "embedder returned nothing, skipping");
            continue;
        };
        records.push(EmbeddingRecord {
            image_path: crop_path.display().to_string(),
            embedding: first.values,
        });
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = std::io::BufWriter::new(fs::File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    tracing::info!(
        artifact = %output_path.display(),
        records = records.len(),
        "wrote embeddings artifact"
    );

    Ok(records)
}
