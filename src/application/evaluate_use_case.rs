// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// One validation pass of a saved checkpoint:
//
//   1. Rebuild the model from <checkpoint>.json and load weights
//   2. Open the test split (the training run's, unless overridden)
//   3. Mean F-score over all batches
//
// Reference: Burn Book §6 (Inference)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::dataset::ShapeNetDataset;
use crate::ml::{
    backend::{self, InferBackend},
    inferencer::Inferencer,
};

/// Options of an evaluation; `None` falls back to the run's config.
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    pub checkpoint:       PathBuf,
    pub test_manifest:    Option<PathBuf>,
    pub data_root:        Option<PathBuf>,
    pub batch_size:       Option<usize>,
    pub num_workers:      Option<usize>,
    pub fscore_threshold: Option<f64>,
}

pub struct EvaluateUseCase {
    options: EvaluateOptions,
}

impl EvaluateUseCase {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    /// Returns the mean F-score of the split.
    pub fn execute(&self) -> Result<f64> {
        let opts       = &self.options;
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(&opts.checkpoint, backend::device())?;
        let cfg        = inferencer.config();

        let manifest = opts.test_manifest.clone().unwrap_or_else(|| cfg.test_manifest.clone());
        let root     = opts.data_root.clone().unwrap_or_else(|| cfg.data_root.clone());
        let dataset  = ShapeNetDataset::open(&manifest, &root, cfg.image_size)
            .context("Cannot open the evaluation split")?;

        let score = inferencer.evaluate(
            dataset,
            opts.batch_size.unwrap_or(cfg.batch_size),
            opts.num_workers.unwrap_or(cfg.num_workers),
            opts.fscore_threshold.unwrap_or(cfg.fscore_threshold),
        )?;
        tracing::info!("Evaluated '{}' on '{}': f-score {:.6}", opts.checkpoint.display(), manifest.display(), score);
        Ok(score)
    }
}
