// ============================================================
// Layer 4 — Sample Loader
// ============================================================
// Reads one sample from disk given its manifest stem.
//
// On-disk layout for a stem `<cat>/<id>/rendering/00`:
//
//   <root>/<cat>/<id>/rendering/00.png   ← rendered view
//   <root>/<cat>/<id>/rendering/00.xyz   ← ground truth
//
// The .xyz file holds one surface point per line with six
// whitespace-separated columns:
//
//   x y z nx ny nz
//
// i.e. the position followed by the unit surface normal.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{ensure, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::ImageTransform;
use crate::domain::sample::MeshSample;

/// Loads (image, points, normals) samples relative to a data root.
#[derive(Debug, Clone)]
pub struct SampleLoader {
    root:      PathBuf,
    transform: ImageTransform,
}

impl SampleLoader {
    pub fn new(root: impl Into<PathBuf>, transform: ImageTransform) -> Self {
        Self { root: root.into(), transform }
    }

    pub fn image_path(&self, stem: &Path) -> PathBuf {
        self.root.join(stem).with_extension("png")
    }

    pub fn points_path(&self, stem: &Path) -> PathBuf {
        self.root.join(stem).with_extension("xyz")
    }

    /// Fail with a clear message if either file of the sample is missing.
    pub fn check_exists(&self, stem: &Path) -> Result<()> {
        for path in [self.image_path(stem), self.points_path(stem)] {
            ensure!(path.is_file(), "sample file '{}' does not exist", path.display());
        }
        Ok(())
    }

    /// Load and transform one sample.
    pub fn load(&self, stem: &Path) -> Result<MeshSample> {
        let image = self.transform.load(&self.image_path(stem))?;

        let points_path = self.points_path(stem);
        let text = fs::read_to_string(&points_path)
            .with_context(|| format!("Cannot read points '{}'", points_path.display()))?;
        let (points, normals) = parse_points(&text)
            .with_context(|| format!("Invalid point file '{}'", points_path.display()))?;

        MeshSample::new(image, self.transform.size(), points, normals)
            .with_context(|| format!("Invalid sample '{}'", stem.display()))
    }
}

/// Parse `x y z nx ny nz` rows into positions and normals.
/// Blank lines and '#' comments are skipped.
pub fn parse_points(text: &str) -> Result<(Vec<[f32; 3]>, Vec<[f32; 3]>)> {
    let mut points  = Vec::new();
    let mut normals = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Vec<f32> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .with_context(|| format!("line {}: unparsable number", lineno + 1))?;
        ensure!(
            values.len() == 6,
            "line {}: expected 6 columns (x y z nx ny nz), found {}",
            lineno + 1,
            values.len()
        );
        points.push([values[0], values[1], values[2]]);
        normals.push([values[3], values[4], values[5]]);
    }

    ensure!(!points.is_empty(), "no points found");
    Ok((points, normals))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    #[test]
    fn test_parse_points_splits_columns() {
        let (p, n) = parse_points("0 0 1 0 0 1\n# comment\n\n1 2 3 0 1 0\n").unwrap();
        assert_eq!(p, vec![[0.0, 0.0, 1.0], [1.0, 2.0, 3.0]]);
        assert_eq!(n, vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_parse_points_wrong_column_count() {
        let err = parse_points("0 0 1 0 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("expected 6 columns"));
    }

    #[test]
    fn test_parse_points_bad_number() {
        assert!(parse_points("0 0 x 0 0 1\n").is_err());
    }

    #[test]
    fn test_parse_points_empty() {
        assert!(parse_points("\n# only comments\n").is_err());
    }

    #[test]
    fn test_load_sample_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let stem = Path::new("cat/obj/rendering/00");
        fs::create_dir_all(dir.path().join("cat/obj/rendering")).unwrap();

        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(9, 9, image::Rgba([1, 2, 3, 255])));
        img.save(dir.path().join("cat/obj/rendering/00.png")).unwrap();
        fs::write(dir.path().join("cat/obj/rendering/00.xyz"), "0 0 -0.8 0 0 1\n0.1 0 -0.8 1 0 0\n").unwrap();

        let loader = SampleLoader::new(dir.path(), ImageTransform::new(4));
        loader.check_exists(stem).unwrap();
        let sample = loader.load(stem).unwrap();
        assert_eq!(sample.image.len(), 3 * 4 * 4);
        assert_eq!(sample.point_count(), 2);
    }

    #[test]
    fn test_check_exists_reports_missing_file() {
        let dir    = tempfile::tempdir().unwrap();
        let loader = SampleLoader::new(dir.path(), ImageTransform::new(4));
        let err    = loader.check_exists(Path::new("nope/00")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
