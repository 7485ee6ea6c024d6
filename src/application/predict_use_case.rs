// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Single image → Wavefront OBJ of the final-stage mesh.
//
// Reference: Burn Book §6 (Inference)

use anyhow::Result;
use std::path::PathBuf;

use crate::infra::mesh_io::write_obj;
use crate::ml::{
    backend::{self, InferBackend},
    inferencer::Inferencer,
};

pub struct PredictUseCase {
    checkpoint: PathBuf,
    image:      PathBuf,
    output:     PathBuf,
}

impl PredictUseCase {
    pub fn new(checkpoint: PathBuf, image: PathBuf, output: PathBuf) -> Self {
        Self { checkpoint, image, output }
    }

    /// Writes the mesh and returns its vertex count.
    pub fn execute(&self) -> Result<usize> {
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(&self.checkpoint, backend::device())?;
        let vertices   = inferencer.predict(&self.image)?;
        write_obj(&self.output, &vertices, inferencer.faces())?;

        tracing::info!(
            "Wrote '{}': {} vertices, {} faces",
            self.output.display(),
            vertices.len(),
            inferencer.faces().len()
        );
        Ok(vertices.len())
    }
}
