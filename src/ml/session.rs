// ============================================================
// Layer 5 — Burn Training Session
// ============================================================
// The Burn-backed implementation of TrainingPhases.
//
// Training phase, per batch:
//   1. forward_loss on the autodiff model
//   2. loss.backward() → GradientsParams
//   3. Adam step: the optimiser consumes the model and returns
//      the updated one
//   4. every log_interval-th batch (index 0, n, 2n, ...):
//        loss: <value>  [<batch_index * batch_len>/<dataset len>]
//
// Validation phase:
//   model.valid() → the same weights on the inner backend,
//   without autodiff tracking. Each batch is scored with the
//   F-score of the final-stage vertices against the ground-truth
//   points.
//
// Both phases show an indicatif progress bar; contract lines are
// printed through it so the bar never overwrites them.
//
// Reference: Burn Book §5 (Custom Training Loop)
//            Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, decay::WeightDecayConfig, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::Path, sync::Arc};

use crate::data::batcher::{MeshBatch, MeshBatcher};
use crate::domain::{sample::MeshSample, traits::TrainingPhases};
use crate::infra::{checkpoint, profiler::StepProfiler};
use crate::ml::{metric::f_score, model::MeshReconModel};

pub type Loader<B> = Arc<dyn DataLoader<B, MeshBatch<B>>>;

/// Sequential (unshuffled) loader whose batches are created on `device`.
pub fn build_loader<B, D>(dataset: D, batch_size: usize, num_workers: usize, device: &B::Device) -> Loader<B>
where
    B: Backend,
    D: Dataset<MeshSample> + 'static,
{
    let mut builder = DataLoaderBuilder::new(MeshBatcher::new())
        .batch_size(batch_size)
        .set_device(device.clone());
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }
    builder.build(dataset)
}

pub(crate) fn progress_bar(len: usize, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template(&format!("{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{eta}})"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn timed<T>(profiler: &mut Option<StepProfiler>, phase: &'static str, f: impl FnOnce() -> T) -> T {
    match profiler {
        Some(p) => p.time(phase, f),
        None    => f(),
    }
}

/// The `loss:` console line for batch `index`, or `None` between log points.
/// `current` counts samples seen before this batch: index × batch length.
pub fn loss_line(loss: f64, index: usize, batch_len: usize, total: usize, log_interval: usize) -> Option<String> {
    (index % log_interval.max(1) == 0)
        .then(|| format!("loss: {:>7.6}  [{:>5}/{:>5}]", loss, index * batch_len, total))
}

/// F-score of every validation batch, in stream order.
pub fn validation_scores<B: Backend>(model: &MeshReconModel<B>, loader: &Loader<B>, threshold: f64) -> Vec<f64> {
    let pb = progress_bar(loader.num_items(), "samples");
    let mut scores = Vec::new();
    for batch in loader.iter() {
        let n = batch.len();
        let prediction = model.forward(batch.images);
        scores.push(f_score(prediction.vertices, batch.points, threshold));
        pb.inc(n as u64);
    }
    pb.finish_and_clear();
    scores
}

/// Knobs of the per-batch loop.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub lr:               f64,
    pub weight_decay:     f64,
    pub log_interval:     usize,
    pub fscore_threshold: f64,
    pub profile:          bool,
}

pub struct BurnSession<B: AutodiffBackend> {
    model:   MeshReconModel<B>,
    optim:   OptimizerAdaptor<Adam, MeshReconModel<B>, B>,
    train:   Loader<B>,
    valid:   Loader<B::InnerBackend>,
    options: SessionOptions,
    profiler: Option<StepProfiler>,
}

impl<B: AutodiffBackend> BurnSession<B> {
    pub fn new(
        model:   MeshReconModel<B>,
        train:   Loader<B>,
        valid:   Loader<B::InnerBackend>,
        options: SessionOptions,
    ) -> Self {
        let optim = AdamConfig::new()
            .with_weight_decay(Some(WeightDecayConfig::new(options.weight_decay as f32)))
            .init();
        let profiler = options.profile.then(StepProfiler::new);
        Self { model, optim, train, valid, options, profiler }
    }

    pub fn model(&self) -> &MeshReconModel<B> {
        &self.model
    }
}

impl<B: AutodiffBackend> TrainingPhases for BurnSession<B> {
    fn train_epoch(&mut self, epoch: usize) -> Result<f64> {
        let total        = self.train.num_items();
        let log_interval = self.options.log_interval;
        let lr           = self.options.lr;
        let pb           = progress_bar(total, "samples");

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for (index, batch) in self.train.iter().enumerate() {
            let n = batch.len();

            let (loss, _) = timed(&mut self.profiler, "forward", || {
                self.model.forward_loss(batch.images, batch.points, batch.normals)
            });
            let loss_val = timed(&mut self.profiler, "loss read", || loss.clone().into_scalar().elem::<f64>());

            let grads = timed(&mut self.profiler, "backward", || {
                GradientsParams::from_grads(loss.backward(), &self.model)
            });
            self.model = timed(&mut self.profiler, "step", || {
                self.optim.step(lr, self.model.clone(), grads)
            });

            loss_sum += loss_val;
            batches  += 1;

            if let Some(line) = loss_line(loss_val, index, n, total, log_interval) {
                pb.suspend(|| println!("{line}"));
            }
            if let Some(profiler) = self.profiler.as_mut() {
                let table = profiler.finish_step();
                pb.suspend(|| println!("{table}"));
            }
            pb.inc(n as u64);
        }
        pb.finish_and_clear();

        if let Some(profiler) = &self.profiler {
            println!("{}", profiler.summary());
        }

        if batches == 0 {
            tracing::warn!("Epoch {} had no training batches", epoch);
            return Ok(f64::NAN);
        }
        let mean = loss_sum / batches as f64;
        tracing::info!("Epoch {} mean training loss {:.6} over {} batches", epoch, mean, batches);
        Ok(mean)
    }

    fn validate(&self) -> Result<Vec<f64>> {
        // valid() drops autodiff tracking; the training model is untouched
        let model = self.model.valid();
        Ok(validation_scores(&model, &self.valid, self.options.fscore_threshold))
    }

    fn save(&self, path: &Path) -> Result<()> {
        checkpoint::save_model(&self.model, path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::{tiny_config, tiny_hierarchy};
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataset::InMemDataset;

    type TestBackend = Autodiff<NdArray>;

    fn sample(shift: f32) -> MeshSample {
        let points  = vec![[0.0, 0.0, -0.8 + shift], [0.1, 0.0, -0.8], [0.0, 0.1, -0.7], [0.0, 0.0, -1.0]];
        let normals = vec![[0.0, 0.0, 1.0]; 4];
        MeshSample::new(vec![0.1 * shift; 3 * 16 * 16], 16, points, normals).unwrap()
    }

    fn dataset(n: usize) -> InMemDataset<MeshSample> {
        InMemDataset::new((0..n).map(|i| sample(i as f32 * 0.01)).collect())
    }

    fn options() -> SessionOptions {
        SessionOptions { lr: 1e-3, weight_decay: 1e-5, log_interval: 1, fscore_threshold: 1e-2, profile: false }
    }

    fn session(train_len: usize, valid_len: usize, batch_size: usize) -> BurnSession<TestBackend> {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&tiny_hierarchy(), &device).unwrap();
        BurnSession::new(
            model,
            build_loader(dataset(train_len), batch_size, 0, &device),
            build_loader(dataset(valid_len), batch_size, 0, &device),
            options(),
        )
    }

    fn output_sum(s: &BurnSession<TestBackend>) -> f32 {
        let images = Tensor::<NdArray, 4>::ones([1, 3, 16, 16], &Default::default());
        s.model().valid().forward(images).vertices.sum().into_scalar().elem()
    }

    #[test]
    fn test_validate_returns_one_score_per_batch() {
        let s = session(1, 3, 2);
        let scores = s.validate().unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|f| (0.0..=1.0).contains(f)));
    }

    #[test]
    fn test_validate_does_not_change_parameters() {
        let s = session(1, 2, 1);
        let before = output_sum(&s);
        s.validate().unwrap();
        s.validate().unwrap();
        assert_eq!(before, output_sum(&s));
    }

    #[test]
    fn test_train_epoch_updates_parameters() {
        let mut s = session(2, 1, 1);
        let before = output_sum(&s);
        let loss = s.train_epoch(1).unwrap();
        assert!(loss.is_finite());
        assert_ne!(before, output_sum(&s));
    }

    #[test]
    fn test_profiled_epoch_runs() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&tiny_hierarchy(), &device).unwrap();
        let mut s  = BurnSession::new(
            model,
            build_loader(dataset(1), 1, 0, &device),
            build_loader(dataset(1), 1, 0, &device),
            SessionOptions { profile: true, ..options() },
        );
        assert!(s.train_epoch(1).unwrap().is_finite());
    }

    #[test]
    fn test_save_writes_record() {
        let dir = tempfile::tempdir().unwrap();
        let s   = session(1, 1, 1);
        s.save(&dir.path().join("best")).unwrap();
        assert!(crate::infra::checkpoint::record_file(&dir.path().join("best")).is_file());
    }

    #[test]
    fn test_loss_line_format() {
        assert_eq!(
            loss_line(0.123456789, 20, 4, 100, 10).as_deref(),
            Some("loss: 0.123457  [   80/  100]")
        );
        assert_eq!(loss_line(12.5, 0, 1, 3, 10).as_deref(), Some("loss: 12.500000  [    0/    3]"));
    }

    #[test]
    fn test_loss_line_cadence() {
        let logged: Vec<usize> = (0..25).filter(|&i| loss_line(1.0, i, 2, 50, 10).is_some()).collect();
        assert_eq!(logged, vec![0, 10, 20]);

        let current: Vec<String> = (0..25).filter_map(|i| loss_line(1.0, i, 2, 50, 10)).collect();
        assert!(current[1].ends_with("[   20/   50]"));
        assert!(current[2].ends_with("[   40/   50]"));
    }

    #[test]
    fn test_loss_line_zero_interval_logs_every_batch() {
        assert!((0..5).all(|i| loss_line(1.0, i, 1, 5, 0).is_some()));
    }
}
