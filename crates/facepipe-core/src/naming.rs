//! Crop filename codec.
//!
//! A crop file's name is the only carrier of provenance across the
//! extraction/embedding boundary — there is no sidecar metadata. The
//! format is `{source_stem}_face{index}_x{x}_y{y}_w{w}_h{h}{suffix}`,
//! with a 1-based index reset per source image and the box taken from
//! the detection, so downstream consumers can recover both the source
//! image and the face location from the name alone.

use crate::types::FacialArea;
use std::path::Path;

/// Provenance recovered from a crop filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropName {
    pub source_stem: String,
    /// 1-based face index within the source image.
    pub index: usize,
    pub area: FacialArea,
}

/// Compute the crop filename for the `index`-th face of `source`.
///
/// The suffix mirrors the source file's, so the crop is encoded in the
/// same container format as the image it came from.
pub fn crop_file_name(source: &Path, index: usize, area: &FacialArea) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!(
        "{stem}_face{index}_x{x}_y{y}_w{w}_h{h}{suffix}",
        x = area.x,
        y = area.y,
        w = area.w,
        h = area.h,
    )
}

/// Parse a crop filename back into its provenance.
///
/// Markers are matched from the right, so a source stem may itself
/// contain underscores (or even an `_h`/`_w` substring) without breaking
/// the split. Returns `None` when the name does not follow the encoding.
pub fn parse_crop_file_name(file_name: &str) -> Option<CropName> {
    let stem = match file_name.rfind('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    };

    let (rest, h) = split_marker(stem, "_h")?;
    let (rest, w) = split_marker(rest, "_w")?;
    let (rest, y) = split_marker(rest, "_y")?;
    let (rest, x) = split_marker(rest, "_x")?;

    let face_pos = rest.rfind("_face")?;
    let index: usize = rest[face_pos + "_face".len()..].parse().ok()?;
    if index == 0 {
        return None;
    }

    Some(CropName {
        source_stem: rest[..face_pos].to_string(),
        index,
        area: FacialArea { x, y, w, h },
    })
}

/// Split `s` at the rightmost `marker`, parsing what follows as an i32.
fn split_marker<'a>(s: &'a str, marker: &str) -> Option<(&'a str, i32)> {
    let pos = s.rfind(marker)?;
    let value = s[pos + marker.len()..].parse().ok()?;
    Some((&s[..pos], value))
}
