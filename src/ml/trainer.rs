// ============================================================
// Layer 5 — Epoch Driver
// ============================================================
// Runs a fixed number of epochs over any TrainingPhases:
//
//   Epoch <n>
//   -------------------------------
//   (a) train_epoch   forward, backward, step per batch
//   (b) validate      one F-score per batch, on valid()
//   (c) mean score    Σ scores / batches
//   (d) checkpoint    only if the mean is strictly above every
//                     earlier epoch's; always the same path
//   f-score: <mean>
//
// and finally `best f-score: <best>`.
//
// Any error from a phase aborts the run; there are no retries.
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{module::Module, tensor::backend::AutodiffBackend};
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::ShapeNetDataset;
use crate::domain::{
    mesh::MeshHierarchy,
    score::{mean_score, BestScore},
    traits::TrainingPhases,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::session::{build_loader, BurnSession};

const EPOCH_RULE: usize = 31;

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Mean validation score of every epoch, in order
    pub epoch_scores:        Vec<f64>,
    pub best:                Option<f64>,
    pub checkpoints_written: usize,
}

/// `Epoch <n>` followed by the dashed rule.
pub fn epoch_banner(epoch: usize) -> String {
    format!("Epoch {epoch}\n{}", "-".repeat(EPOCH_RULE))
}

pub fn score_line(score: f64) -> String {
    format!("f-score: {score}")
}

pub fn best_line(best: &BestScore) -> String {
    format!("best f-score: {}", best.value())
}

pub fn run_epochs<P: TrainingPhases>(
    phases:     &mut P,
    epochs:     usize,
    checkpoint: &Path,
    metrics:    Option<&MetricsLogger>,
) -> Result<RunSummary> {
    let mut best         = BestScore::new();
    let mut epoch_scores = Vec::with_capacity(epochs);
    let mut written      = 0usize;

    for epoch in 1..=epochs {
        println!("{}", epoch_banner(epoch));

        let train_loss = phases.train_epoch(epoch)?;
        let scores     = phases.validate()?;
        let score      = mean_score(&scores)?;
        println!("{}", score_line(score));

        let improved = best.observe(score);
        if improved {
            phases.save(checkpoint)?;
            written += 1;
            tracing::info!("Epoch {}: new best f-score {:.6}, checkpoint '{}'", epoch, score, checkpoint.display());
        }

        if let Some(logger) = metrics {
            logger.log(&EpochMetrics {
                epoch,
                train_loss,
                f_score: score,
                best_f_score: best.value(),
                checkpoint_written: improved,
            })?;
        }
        epoch_scores.push(score);
    }

    println!("{}", best_line(&best));
    Ok(RunSummary { epoch_scores, best: best.get(), checkpoints_written: written })
}

/// Build the model, loaders and session for `cfg` and run every epoch.
pub fn run_training<B: AutodiffBackend>(
    cfg:       &TrainConfig,
    train:     ShapeNetDataset,
    valid:     ShapeNetDataset,
    hierarchy: &MeshHierarchy,
    ckpt:      &CheckpointManager,
    device:    B::Device,
) -> Result<RunSummary> {
    B::seed(&device, cfg.seed);

    let model = cfg.model_config().init::<B>(hierarchy, &device)?;
    tracing::info!(
        "Model ready: {} stages, {} → {} vertices, hidden={}",
        model.stage_count(),
        hierarchy.stages[0].vertex_count(),
        hierarchy.final_mesh().vertex_count(),
        cfg.hidden_dim
    );

    let train_loader = build_loader::<B, _>(train, cfg.batch_size, cfg.num_workers, &device);
    let valid_loader = build_loader::<B::InnerBackend, _>(valid, cfg.batch_size, cfg.num_workers, &device);

    let mut session = BurnSession::new(model, train_loader, valid_loader, cfg.session_options());
    let metrics     = MetricsLogger::new(&cfg.checkpoint_dir)?;
    tracing::info!(
        "{} trainable parameters; epoch metrics in '{}'",
        session.model().num_params(),
        metrics.csv_path().display()
    );
    run_epochs(&mut session, cfg.epochs, &ckpt.model_path(), Some(&metrics))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    /// Canned per-epoch batch scores; records every save.
    struct FakePhases {
        scores: Vec<Vec<f64>>,
        epoch:  Cell<usize>,
        saves:  RefCell<Vec<(usize, PathBuf)>>,
        fail_validation_at: Option<usize>,
    }

    impl FakePhases {
        fn new(scores: Vec<Vec<f64>>) -> Self {
            Self { scores, epoch: Cell::new(0), saves: RefCell::new(Vec::new()), fail_validation_at: None }
        }
    }

    impl TrainingPhases for FakePhases {
        fn train_epoch(&mut self, epoch: usize) -> Result<f64> {
            self.epoch.set(epoch);
            Ok(1.0 / epoch as f64)
        }

        fn validate(&self) -> Result<Vec<f64>> {
            let epoch = self.epoch.get();
            if self.fail_validation_at == Some(epoch) {
                bail!("validation failed");
            }
            Ok(self.scores[epoch - 1].clone())
        }

        fn save(&self, path: &Path) -> Result<()> {
            self.saves.borrow_mut().push((self.epoch.get(), path.to_path_buf()));
            Ok(())
        }
    }

    fn ckpt() -> PathBuf {
        PathBuf::from("checkpoints/03-07_09:05")
    }

    #[test]
    fn test_improving_run_overwrites_one_file_twice() {
        let mut phases = FakePhases::new(vec![vec![0.41], vec![0.53]]);
        let summary = run_epochs(&mut phases, 2, &ckpt(), None).unwrap();

        assert_eq!(summary.best, Some(0.53));
        assert_eq!(summary.epoch_scores, vec![0.41, 0.53]);
        assert_eq!(summary.checkpoints_written, 2);

        // Both writes hit the same file; its final contents come from epoch 2
        let saves = phases.saves.borrow();
        assert_eq!(saves.iter().map(|s| s.0).collect::<Vec<_>>(), vec![1, 2]);
        let mut paths: Vec<&PathBuf> = saves.iter().map(|(_, p)| p).collect();
        paths.dedup();
        assert_eq!(paths, vec![&ckpt()]);
    }

    #[test]
    fn test_worse_second_epoch_writes_nothing() {
        let mut phases = FakePhases::new(vec![vec![0.53], vec![0.41]]);
        let summary = run_epochs(&mut phases, 2, &ckpt(), None).unwrap();

        assert_eq!(summary.best, Some(0.53));
        assert_eq!(summary.checkpoints_written, 1);
        assert_eq!(phases.saves.borrow().iter().map(|s| s.0).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_equal_score_is_not_an_improvement() {
        let mut phases = FakePhases::new(vec![vec![0.5], vec![0.5], vec![0.6]]);
        let summary = run_epochs(&mut phases, 3, &ckpt(), None).unwrap();
        assert_eq!(phases.saves.borrow().iter().map(|s| s.0).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(summary.checkpoints_written, 2);
    }

    #[test]
    fn test_checkpoint_path_is_fixed_for_the_run() {
        let mut phases = FakePhases::new(vec![vec![0.1], vec![0.2], vec![0.3]]);
        run_epochs(&mut phases, 3, &ckpt(), None).unwrap();
        let saves = phases.saves.borrow();
        assert_eq!(saves.len(), 3);
        assert!(saves.iter().all(|(_, p)| *p == ckpt()));
    }

    #[test]
    fn test_epoch_score_is_mean_of_batches() {
        let mut phases = FakePhases::new(vec![vec![0.2, 0.4, 0.9]]);
        let summary = run_epochs(&mut phases, 1, &ckpt(), None).unwrap();
        assert!((summary.epoch_scores[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_first_epoch_with_zero_score_still_checkpoints() {
        let mut phases = FakePhases::new(vec![vec![0.0]]);
        let summary = run_epochs(&mut phases, 1, &ckpt(), None).unwrap();
        assert_eq!(summary.checkpoints_written, 1);
        assert_eq!(summary.best, Some(0.0));
    }

    #[test]
    fn test_empty_validation_aborts() {
        let mut phases = FakePhases::new(vec![vec![]]);
        assert!(run_epochs(&mut phases, 1, &ckpt(), None).is_err());
        assert!(phases.saves.borrow().is_empty());
    }

    #[test]
    fn test_phase_error_aborts_run() {
        let mut phases = FakePhases::new(vec![vec![0.3], vec![0.9]]);
        phases.fail_validation_at = Some(2);
        assert!(run_epochs(&mut phases, 2, &ckpt(), None).is_err());
        assert_eq!(phases.saves.borrow().len(), 1);
    }

    #[test]
    fn test_zero_epochs() {
        let mut phases = FakePhases::new(vec![]);
        let summary = run_epochs(&mut phases, 0, &ckpt(), None).unwrap();
        assert_eq!(summary.best, None);
        assert!(summary.epoch_scores.is_empty());
    }

    #[test]
    fn test_metrics_rows_follow_checkpoint_decisions() {
        let dir     = tempfile::tempdir().unwrap();
        let logger  = MetricsLogger::new(dir.path()).unwrap();
        let mut phases = FakePhases::new(vec![vec![0.53], vec![0.41]]);
        run_epochs(&mut phases, 2, &ckpt(), Some(&logger)).unwrap();

        let text = std::fs::read_to_string(logger.csv_path()).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows, vec!["1,1.000000,0.530000,0.530000,1", "2,0.500000,0.410000,0.530000,0"]);
    }

    #[test]
    fn test_console_lines() {
        assert_eq!(epoch_banner(3), format!("Epoch 3\n{}", "-".repeat(31)));
        assert_eq!(epoch_banner(1).lines().nth(1).map(str::len), Some(31));
        assert_eq!(score_line(0.53), "f-score: 0.53");

        let mut best = BestScore::new();
        assert_eq!(best_line(&best), "best f-score: 0");
        best.observe(0.41);
        best.observe(0.53);
        assert_eq!(best_line(&best), "best f-score: 0.53");
    }
}
