// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `train`, `evaluate`, `predict`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{anyhow, ensure, Error};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{evaluate_use_case::EvaluateOptions, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the mesh reconstruction model
    Train(TrainArgs),

    /// Score a saved checkpoint on a test split
    Evaluate(EvaluateArgs),

    /// Reconstruct a mesh from one image and write it as OBJ
    Predict(PredictArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training sample list, one path per line relative to --data-root
    #[arg(long, default_value = "data/train_list.txt")]
    pub train_manifest: PathBuf,

    /// Test sample list used for validation after every epoch
    #[arg(long, default_value = "data/test_list.txt")]
    pub test_manifest: PathBuf,

    /// Directory holding the <sample>.png / <sample>.xyz files
    #[arg(long, default_value = "data/ShapeNetP2M")]
    pub data_root: PathBuf,

    /// Seed mesh (.ply or .obj); a built-in ellipsoid when omitted
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Principal point in pixels (column row)
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [112.0, 112.0])]
    pub camera_c: Vec<f64>,

    /// Focal length in pixels (column row)
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [250.0, 250.0])]
    pub camera_f: Vec<f64>,

    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 3e-5)]
    pub lr: f64,

    /// Adam weight decay
    #[arg(long, default_value_t = 1e-5)]
    pub weight_decay: f64,

    /// Print the training loss every N batches
    #[arg(long, default_value_t = 10)]
    pub log_interval: usize,

    /// Loader threads; 0 loads in-process
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,

    /// Side length the input images are resized to
    #[arg(long, default_value_t = 224)]
    pub image_size: usize,

    /// Output channels of each encoder stage, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [16, 32, 64, 128])]
    pub encoder_channels: Vec<usize>,

    /// Width of the graph convolutions
    #[arg(long, default_value_t = 192)]
    pub hidden_dim: usize,

    /// Residual graph blocks per deformation stage
    #[arg(long = "blocks", default_value_t = 6)]
    pub residual_blocks: usize,

    /// Deformation stages (the mesh is subdivided between stages)
    #[arg(long, default_value_t = 3)]
    pub stages: usize,

    /// Squared-distance threshold of the F-score
    #[arg(long, default_value_t = 1e-4)]
    pub fscore_threshold: f64,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Print per-batch phase timings
    #[arg(long)]
    pub profile: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn pair(name: &str, values: &[f64]) -> Result<[f64; 2], Error> {
    match values {
        [x, y] => Ok([*x, *y]),
        _ => Err(anyhow!("--{name} takes exactly two values, got {}", values.len())),
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl TryFrom<TrainArgs> for TrainConfig {
    type Error = Error;

    fn try_from(a: TrainArgs) -> Result<Self, Error> {
        ensure!(a.image_size > 0, "--image-size must be at least 1");
        ensure!(a.batch_size > 0, "--batch-size must be at least 1");

        Ok(TrainConfig {
            train_manifest:   a.train_manifest,
            test_manifest:    a.test_manifest,
            data_root:        a.data_root,
            template:         a.template,
            camera_c:         pair("camera-c", &a.camera_c)?,
            camera_f:         pair("camera-f", &a.camera_f)?,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            weight_decay:     a.weight_decay,
            log_interval:     a.log_interval,
            num_workers:      a.num_workers,
            image_size:       a.image_size,
            encoder_channels: a.encoder_channels,
            hidden_dim:       a.hidden_dim,
            residual_blocks:  a.residual_blocks,
            stages:           a.stages,
            fscore_threshold: a.fscore_threshold,
            checkpoint_dir:   a.checkpoint_dir,
            profile:          a.profile,
            seed:             a.seed,
        })
    }
}

/// All arguments for the `evaluate` command.
/// Unset options fall back to the values saved with the checkpoint.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Checkpoint written by `train` (with or without .mpk)
    #[arg(long)]
    pub checkpoint: PathBuf,

    #[arg(long)]
    pub test_manifest: Option<PathBuf>,

    #[arg(long)]
    pub data_root: Option<PathBuf>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub num_workers: Option<usize>,

    #[arg(long)]
    pub fscore_threshold: Option<f64>,
}

impl From<EvaluateArgs> for EvaluateOptions {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateOptions {
            checkpoint:       a.checkpoint,
            test_manifest:    a.test_manifest,
            data_root:        a.data_root,
            batch_size:       a.batch_size,
            num_workers:      a.num_workers,
            fscore_threshold: a.fscore_threshold,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(long)]
    pub checkpoint: PathBuf,

    /// Input rendering (PNG or JPEG)
    #[arg(long)]
    pub image: PathBuf,

    /// Destination .obj file
    #[arg(long)]
    pub output: PathBuf,
}
