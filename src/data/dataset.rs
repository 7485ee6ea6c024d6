// ============================================================
// Layer 4 — ShapeNet Dataset Adapter
// ============================================================
// Implements Burn's Dataset trait over a manifest of samples.
//
// The manifest is read eagerly and every referenced file is
// checked up front, so a broken split fails before training
// starts. Images and point files are decoded lazily in get(),
// one sample at a time, in manifest order.
//
// Burn's Dataset::get returns an Option and cannot carry an
// error. A sample that exists but fails to decode aborts the
// run with the full error chain.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use std::path::{Path, PathBuf};

use crate::data::{loader::SampleLoader, manifest::read_manifest, preprocessor::ImageTransform};
use crate::domain::sample::MeshSample;

#[derive(Debug)]
pub struct ShapeNetDataset {
    stems:  Vec<PathBuf>,
    loader: SampleLoader,
}

impl ShapeNetDataset {
    /// Open the split described by `manifest`, with files under `root`.
    pub fn open(manifest: &Path, root: &Path, image_size: usize) -> Result<Self> {
        let stems  = read_manifest(manifest)?;
        let loader = SampleLoader::new(root, ImageTransform::new(image_size));

        for stem in &stems {
            loader
                .check_exists(stem)
                .with_context(|| format!("manifest '{}' is inconsistent with '{}'", manifest.display(), root.display()))?;
        }

        tracing::info!("Opened '{}': {} samples", manifest.display(), stems.len());
        Ok(Self { stems, loader })
    }

    pub fn sample_count(&self) -> usize {
        self.stems.len()
    }
}

impl Dataset<MeshSample> for ShapeNetDataset {
    fn get(&self, index: usize) -> Option<MeshSample> {
        let stem = self.stems.get(index)?;
        match self.loader.load(stem) {
            Ok(sample) => Some(sample),
            Err(err) => panic!("failed to load sample {index} ('{}'): {err:#}", stem.display()),
        }
    }

    fn len(&self) -> usize {
        self.stems.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};
    use std::fs;

    fn write_sample(root: &Path, stem: &str) {
        let base = root.join(stem);
        fs::create_dir_all(base.parent().unwrap()).unwrap();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 255])))
            .save(base.with_extension("png"))
            .unwrap();
        fs::write(base.with_extension("xyz"), "0 0 -1 0 0 1\n").unwrap();
    }

    #[test]
    fn test_open_and_get_in_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path(), "a/rendering/00");
        write_sample(dir.path(), "b/rendering/01");
        let manifest = dir.path().join("meta.txt");
        fs::write(&manifest, "b/rendering/01.dat\na/rendering/00.dat\n").unwrap();

        let ds = ShapeNetDataset::open(&manifest, dir.path(), 4).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.get(0).is_some());
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_open_fails_on_missing_sample() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path(), "a/rendering/00");
        let manifest = dir.path().join("meta.txt");
        fs::write(&manifest, "a/rendering/00.dat\nmissing/rendering/00.dat\n").unwrap();

        let err = ShapeNetDataset::open(&manifest, dir.path(), 4).unwrap_err();
        assert!(format!("{err:#}").contains("missing"));
    }
}
