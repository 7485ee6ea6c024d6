// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns a rendered view into the network's input tensor data.
//
// Steps (applied in order):
//   1. Composite onto white: fully transparent pixels become
//      white, as the renderings have a transparent background
//   2. Resize to size × size with a triangle (bilinear) filter
//   3. Scale 8-bit channels to [0, 1]
//   4. Normalise per channel with the ImageNet statistics
//        x' = (x - mean[c]) / std[c]
//   5. Lay out as CHW (all red, then all green, then all blue)
//
// The transform is deterministic: the same file always yields
// exactly the same floats.
//
// Reference: image crate documentation
//            Rust Book §8 (Vectors)

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, RgbaImage};
use std::path::Path;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

/// Deterministic resize + normalise transform.
#[derive(Debug, Clone)]
pub struct ImageTransform {
    size: u32,
    mean: [f32; 3],
    std:  [f32; 3],
}

impl ImageTransform {
    /// Transform to `size × size` with ImageNet normalisation
    pub fn new(size: usize) -> Self {
        Self { size: size as u32, mean: IMAGENET_MEAN, std: IMAGENET_STD }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Decode an image file and transform it.
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.apply(&img))
    }

    /// Transform an already decoded image into CHW floats.
    pub fn apply(&self, img: &DynamicImage) -> Vec<f32> {
        let mut rgba: RgbaImage = img.to_rgba8();
        for px in rgba.pixels_mut() {
            if px[3] == 0 {
                *px = image::Rgba([255, 255, 255, 255]);
            }
        }

        let resized = if rgba.dimensions() == (self.size, self.size) {
            rgba
        } else {
            image::imageops::resize(&rgba, self.size, self.size, FilterType::Triangle)
        };

        let plane = (self.size * self.size) as usize;
        let mut out = vec![0.0f32; 3 * plane];
        for (i, px) in resized.pixels().enumerate() {
            for c in 0..3 {
                let x = px[c] as f32 / 255.0;
                out[c * plane + i] = (x - self.mean[c]) / self.std[c];
            }
        }
        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, image::Rgba(px)))
    }

    #[test]
    fn test_output_length_is_chw() {
        let t   = ImageTransform::new(8);
        let out = t.apply(&solid(20, 10, [10, 20, 30, 255]));
        assert_eq!(out.len(), 3 * 8 * 8);
    }

    #[test]
    fn test_normalisation_per_channel() {
        let t   = ImageTransform::new(4);
        let out = t.apply(&solid(4, 4, [0, 255, 0, 255]));
        // Red channel: (0 - 0.485) / 0.229
        assert!((out[0] - (-0.485 / 0.229)).abs() < 1e-5);
        // Green channel starts after one full plane
        assert!((out[16] - ((1.0 - 0.456) / 0.224)).abs() < 1e-5);
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let t   = ImageTransform::new(2);
        let out = t.apply(&solid(2, 2, [0, 0, 0, 0]));
        let white_blue = (1.0 - 0.406) / 0.225;
        assert!((out[2 * 4] - white_blue).abs() < 1e-5);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let t   = ImageTransform::new(6);
        let img = solid(13, 7, [90, 120, 200, 255]);
        assert_eq!(t.apply(&img), t.apply(&img));
    }

    #[test]
    fn test_load_png_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.png");
        solid(5, 5, [255, 0, 0, 255]).save(&path).unwrap();

        let out = ImageTransform::new(5).load(&path).unwrap();
        assert!((out[0] - ((1.0 - 0.485) / 0.229)).abs() < 1e-5);
    }
}
