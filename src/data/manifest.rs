// ============================================================
// Layer 4 — Sample Manifest
// ============================================================
// A manifest lists the samples of one split, one per line,
// relative to the data root. Published Pixel2Mesh meta files
// look like:
//
//   Data/ShapeNetP2M/02691156/1a04e3eab45ca15dd86060f189eb133/rendering/00.dat
//
// The leading "Data/ShapeNetP2M/" is an artefact of the published
// archive layout and is stripped. The extension is dropped too;
// the loader appends ".png" and ".xyz" to the remaining stem.
//
// Blank lines and lines starting with '#' are ignored.
//
// Reference: Rust Book §8 (Strings), §13 (Iterators)

use anyhow::{ensure, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

const ARCHIVE_PREFIX: &str = "Data/ShapeNetP2M/";

/// Parse manifest text into sample stems (relative paths without extension).
pub fn parse_manifest(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let rel = line.strip_prefix(ARCHIVE_PREFIX).unwrap_or(line);
            PathBuf::from(rel).with_extension("")
        })
        .collect()
}

/// Read and parse a manifest file. An empty manifest is an error.
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read manifest '{}'", path.display()))?;
    let stems = parse_manifest(&text);
    ensure!(!stems.is_empty(), "manifest '{}' lists no samples", path.display());
    tracing::debug!("Manifest '{}': {} samples", path.display(), stems.len());
    Ok(stems)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefix_and_extension() {
        let stems = parse_manifest("Data/ShapeNetP2M/02691156/abc/rendering/00.dat\n");
        assert_eq!(stems, vec![PathBuf::from("02691156/abc/rendering/00")]);
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let text  = "# train split\n\n  a/b/01.dat  \n\nc/d/02\n";
        let stems = parse_manifest(text);
        assert_eq!(stems, vec![PathBuf::from("a/b/01"), PathBuf::from("c/d/02")]);
    }

    #[test]
    fn test_preserves_order() {
        let stems = parse_manifest("z/1.dat\na/2.dat\nm/3.dat\n");
        let names: Vec<_> = stems.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["z/1", "a/2", "m/3"]);
    }

    #[test]
    fn test_empty_manifest_file_is_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.txt");
        fs::write(&path, "# nothing here\n").unwrap();
        assert!(read_manifest(&path).is_err());
    }

    #[test]
    fn test_missing_manifest_file_is_error() {
        let err = read_manifest(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(err.to_string().contains("Cannot read manifest"));
    }
}
