// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Build the mesh hierarchy    (Layer 3/6 - template)
//   Step 2: Open train and test splits  (Layer 4 - data)
//   Step 3: Fix the checkpoint name     (Layer 6 - infra)
//   Step 4: Save config                 (Layer 6 - infra)
//   Step 5: Run the epoch loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::dataset::ShapeNetDataset;
use crate::domain::mesh::{MeshHierarchy, MeshTemplate};
use crate::infra::{checkpoint::CheckpointManager, mesh_io::read_template};
use crate::ml::{
    backend::{self, TrainBackend},
    loss::LossWeights,
    metric::DEFAULT_FSCORE_THRESHOLD,
    model::MeshReconConfig,
    projection::Camera,
    session::SessionOptions,
    trainer::{run_training, RunSummary},
};

// Procedural seed mesh used when no template file is given
const ELLIPSOID_RINGS:    usize    = 8;
const ELLIPSOID_SEGMENTS: usize    = 16;
const ELLIPSOID_RADII:    [f32; 3] = [0.2, 0.2, 0.4];
const ELLIPSOID_CENTER:   [f32; 3] = [0.0, 0.0, -0.8];

// ─── Training Configuration ──────────────────────────────────────────────────
// Every option of a run. Saved as JSON next to the checkpoint so
// evaluate/predict can rebuild exactly the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_manifest:   PathBuf,
    pub test_manifest:    PathBuf,
    pub data_root:        PathBuf,
    /// PLY/OBJ seed mesh; the built-in ellipsoid when absent
    pub template:         Option<PathBuf>,
    pub camera_c:         [f64; 2],
    pub camera_f:         [f64; 2],
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub weight_decay:     f64,
    pub log_interval:     usize,
    pub num_workers:      usize,
    pub image_size:       usize,
    pub encoder_channels: Vec<usize>,
    pub hidden_dim:       usize,
    pub residual_blocks:  usize,
    pub stages:           usize,
    pub fscore_threshold: f64,
    pub checkpoint_dir:   PathBuf,
    pub profile:          bool,
    pub seed:             u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_manifest:   PathBuf::from("data/train_list.txt"),
            test_manifest:    PathBuf::from("data/test_list.txt"),
            data_root:        PathBuf::from("data/ShapeNetP2M"),
            template:         None,
            camera_c:         [112.0, 112.0],
            camera_f:         [250.0, 250.0],
            batch_size:       1,
            epochs:           1,
            lr:               3e-5,
            weight_decay:     1e-5,
            log_interval:     10,
            num_workers:      0,
            image_size:       224,
            encoder_channels: vec![16, 32, 64, 128],
            hidden_dim:       192,
            residual_blocks:  6,
            stages:           3,
            fscore_threshold: DEFAULT_FSCORE_THRESHOLD,
            checkpoint_dir:   PathBuf::from("checkpoints"),
            profile:          false,
            seed:             42,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> MeshReconConfig {
        MeshReconConfig::new()
            .with_image_size(self.image_size)
            .with_camera(Camera { c: self.camera_c, f: self.camera_f })
            .with_encoder_channels(self.encoder_channels.clone())
            .with_hidden_dim(self.hidden_dim)
            .with_residual_blocks(self.residual_blocks)
            .with_stages(self.stages)
            .with_loss(LossWeights::new())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            lr:               self.lr,
            weight_decay:     self.weight_decay,
            log_interval:     self.log_interval,
            fscore_threshold: self.fscore_threshold,
            profile:          self.profile,
        }
    }

    /// The seed mesh: the template file if one is configured, else the ellipsoid.
    pub fn load_template(&self) -> Result<MeshTemplate> {
        match &self.template {
            Some(path) => read_template(path),
            None => MeshTemplate::ellipsoid(ELLIPSOID_RINGS, ELLIPSOID_SEGMENTS, ELLIPSOID_RADII, ELLIPSOID_CENTER),
        }
    }

    pub fn load_hierarchy(&self) -> Result<MeshHierarchy> {
        let template = self.load_template()?;
        Ok(MeshHierarchy::new(template, self.stages))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<RunSummary> {
        let cfg     = &self.config;
        let started = Local::now();

        // ── Step 1: Seed mesh and its subdivisions ────────────────────────────
        let hierarchy = cfg.load_hierarchy()?;
        tracing::info!(
            "Mesh hierarchy: {:?} vertices per stage",
            hierarchy.stages.iter().map(MeshTemplate::vertex_count).collect::<Vec<_>>()
        );

        // ── Step 2: Train and test splits ─────────────────────────────────────
        let train = ShapeNetDataset::open(&cfg.train_manifest, &cfg.data_root, cfg.image_size)
            .context("Cannot open the training split")?;
        let valid = ShapeNetDataset::open(&cfg.test_manifest, &cfg.data_root, cfg.image_size)
            .context("Cannot open the test split")?;
        tracing::info!("Split: {} train, {} test", train.sample_count(), valid.sample_count());

        // ── Step 3 + 4: Run-fixed checkpoint name and config ──────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir, started)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Epoch loop (Layer 5) ──────────────────────────────────────
        let device = backend::device();
        tracing::info!("Using device: {:?}", device);
        run_training::<TrainBackend>(cfg, train, valid, &hierarchy, &ckpt, device)
    }
}
