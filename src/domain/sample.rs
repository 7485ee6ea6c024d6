// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One training example for image → mesh reconstruction:
//   - the rendered view of the object, already transformed
//     into normalised CHW floats
//   - the ground-truth surface as a point cloud
//   - one unit normal per ground-truth point
//
// Samples are produced by the dataset adapter, never mutated,
// and dropped once their batch has been consumed.
//
// Reference: Rust Book §5 (Structs and Methods)

use anyhow::{ensure, Result};

/// A single (image, points, normals) sample.
#[derive(Debug, Clone)]
pub struct MeshSample {
    /// Normalised image, CHW layout, length = 3 * size * size
    pub image:      Vec<f32>,
    /// Side length of the square image
    pub image_size: usize,
    /// Ground-truth surface points
    pub points:     Vec<[f32; 3]>,
    /// Ground-truth surface normals, one per point
    pub normals:    Vec<[f32; 3]>,
}

impl MeshSample {
    /// Build a sample, checking that the buffers agree with each other.
    pub fn new(
        image:      Vec<f32>,
        image_size: usize,
        points:     Vec<[f32; 3]>,
        normals:    Vec<[f32; 3]>,
    ) -> Result<Self> {
        ensure!(
            image.len() == 3 * image_size * image_size,
            "image buffer has {} values, expected 3x{image_size}x{image_size}",
            image.len()
        );
        ensure!(!points.is_empty(), "sample has no ground-truth points");
        ensure!(
            points.len() == normals.len(),
            "sample has {} points but {} normals",
            points.len(),
            normals.len()
        );
        Ok(Self { image, image_size, points, normals })
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}
