// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained model from a checkpoint and its config
// JSON, then either scores a whole split (evaluate) or turns a
// single image into a mesh (predict).
//
// The model runs on a plain (non-autodiff) backend: inference
// never needs gradients.
//
// Reference: Burn Book §6 (Inference)

use anyhow::{anyhow, Result};
use burn::prelude::*;
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::{dataset::ShapeNetDataset, preprocessor::ImageTransform};
use crate::domain::{mesh::MeshHierarchy, score::mean_score};
use crate::infra::checkpoint;
use crate::ml::{
    model::MeshReconModel,
    session::{build_loader, validation_scores},
};

pub struct Inferencer<B: Backend> {
    model:     MeshReconModel<B>,
    config:    TrainConfig,
    hierarchy: MeshHierarchy,
    device:    B::Device,
}

impl<B: Backend> Inferencer<B> {
    /// Load `<checkpoint>.json` and `<checkpoint>.mpk`.
    pub fn from_checkpoint(path: &Path, device: B::Device) -> Result<Self> {
        let config    = checkpoint::load_config(path)?;
        let hierarchy = config.load_hierarchy()?;
        let model     = config.model_config().init::<B>(&hierarchy, &device)?;
        let model     = checkpoint::load_model(model, path, &device)?;
        tracing::info!(
            "Model loaded from '{}' ({} stages, {} output vertices)",
            path.display(),
            model.stage_count(),
            hierarchy.final_mesh().vertex_count()
        );
        Ok(Self { model, config, hierarchy, device })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Faces of the predicted mesh; they index into `predict`'s vertices.
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.hierarchy.final_mesh().faces
    }

    /// Mean F-score over every batch of `dataset`.
    pub fn evaluate(&self, dataset: ShapeNetDataset, batch_size: usize, num_workers: usize, threshold: f64) -> Result<f64> {
        let loader = build_loader::<B, _>(dataset, batch_size, num_workers, &self.device);
        let scores = validation_scores(&self.model, &loader, threshold);
        mean_score(&scores)
    }

    /// Final-stage vertex positions for one image file.
    pub fn predict(&self, image: &Path) -> Result<Vec<[f32; 3]>> {
        let size   = self.config.image_size;
        let pixels = ImageTransform::new(size).load(image)?;
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 3, size, size]).convert::<B::FloatElem>(),
            &self.device,
        );

        let vertices: Vec<f32> = self
            .model
            .forward(images)
            .vertices
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read predicted vertices: {e:?}"))?;

        Ok(vertices.chunks_exact(3).map(|v| [v[0], v[1], v[2]]).collect())
    }
}
