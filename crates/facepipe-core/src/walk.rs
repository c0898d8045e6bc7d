//! Input enumeration shared by both pipeline passes.
//!
//! Ordering is a correctness contract: for the same filesystem state the
//! same inputs always enumerate in the same order, which is what makes
//! extraction and embedding runs reproducible.

use std::io;
use std::path::{Path, PathBuf};

/// Raster formats both passes accept, matched case-insensitively on the
/// file suffix.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Whether a path carries a supported image extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Expand a sequence of input paths into concrete image paths.
///
/// A directory expands to its direct children (no recursion) filtered by
/// [`IMAGE_EXTENSIONS`], in lexicographic filename order. A file passes
/// through unfiltered — the caller named it explicitly and is trusted.
/// Inputs expand in argument order, each fully before the next.
pub fn iter_image_paths(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            paths.extend(list_faces(input)?);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

/// Flat listing of a directory: direct children with a supported
/// extension, in lexicographic filename order.
pub fn list_faces(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    children.sort();
    children.retain(|p| is_supported(p));
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_supported_extensions_case_insensitive() {
        assert!(is_supported(Path::new("a.jpg")));
        assert!(is_supported(Path::new("a.JPEG")));
        assert!(is_supported(Path::new("a.PNG")));
        assert!(is_supported(Path::new("a.Tif")));
        assert!(!is_supported(Path::new("a.txt")));
        assert!(!is_supported(Path::new("a.webp")));
        assert!(!is_supported(Path::new("noext")));
    }

    #[test]
    fn test_directory_filtered_and_sorted() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("c.PNG"));
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("a.jpg"));

        let paths = iter_image_paths(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.jpg", "c.PNG"]);
    }

    #[test]
    fn test_no_recursion() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.jpg"));
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested").join("deep.jpg"));

        let paths = iter_image_paths(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("top.jpg"));
    }

    #[test]
    fn test_explicit_file_bypasses_filter() {
        let dir = tempdir().unwrap();
        let odd = dir.path().join("picture.webp");
        touch(&odd);

        let paths = iter_image_paths(&[odd.clone()]).unwrap();
        assert_eq!(paths, vec![odd]);
    }

    #[test]
    fn test_inputs_expand_in_argument_order() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        touch(&dir_a.path().join("z.jpg"));
        touch(&dir_b.path().join("a.jpg"));
        let lone = dir_b.path().join("lone.png");
        touch(&lone);

        let paths = iter_image_paths(&[
            dir_a.path().to_path_buf(),
            lone.clone(),
            dir_b.path().to_path_buf(),
        ])
        .unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["z.jpg", "lone.png", "a.jpg", "lone.png"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("missing");
        assert!(list_faces(&gone).is_err());
    }
}
