// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// One run writes at most one checkpoint. Its name is fixed when
// the run starts, from the local start time, so every improving
// epoch overwrites the same file:
//
//   checkpoints/
//     10-19_14:30.mpk   ← best weights of the run
//     10-19_14:30.json  ← run configuration
//
// The configuration is needed to rebuild the exact model
// (template, stages, widths) before the weights can be loaded
// into it.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Stores floats at half precision
//   - Appends its own extension (`.mpk`) to the path it is given
//
// The extension is asked from the recorder rather than spelled
// out here, so paths on disk and paths in log lines agree.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use chrono::{DateTime, Local};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::{backend::ComputeBackend, model::MeshReconModel};

/// Extension CompactRecorder appends to a checkpoint stem, without the dot.
pub fn record_extension() -> &'static str {
    <CompactRecorder as FileRecorder<ComputeBackend>>::file_extension()
}

/// The file the recorder actually writes for `stem`.
pub fn record_file(stem: &Path) -> PathBuf {
    let mut name: OsString = stem.as_os_str().to_os_string();
    name.push(".");
    name.push(record_extension());
    PathBuf::from(name)
}

/// Owns the checkpoint directory and the run's fixed file stem.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir:   PathBuf,
    stamp: String,
}

impl CheckpointManager {
    /// Create the directory if needed and fix the run's file name.
    pub fn new(dir: impl Into<PathBuf>, started: DateTime<Local>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, stamp: run_stamp(started) })
    }

    /// Checkpoint path without extension; the recorder adds its own.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.stamp)
    }

    pub fn config_path(&self) -> PathBuf {
        config_path(&self.model_path())
    }

    /// Write the run configuration next to the checkpoint.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }
}

/// `MM-DD_HH:MM` of the run's start time.
pub fn run_stamp(started: DateTime<Local>) -> String {
    started.format("%m-%d_%H:%M").to_string()
}

/// Accept a checkpoint path with or without the recorder's extension.
pub fn checkpoint_stem(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == record_extension() => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// The configuration JSON that belongs to a checkpoint.
pub fn config_path(checkpoint: &Path) -> PathBuf {
    let mut name: OsString = checkpoint_stem(checkpoint).into_os_string();
    name.push(".json");
    PathBuf::from(name)
}

pub fn save_model<B: Backend>(model: &MeshReconModel<B>, path: &Path) -> Result<()> {
    let path = checkpoint_stem(path);
    CompactRecorder::new()
        .record(model.clone().into_record(), path.clone())
        .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

    tracing::debug!("Saved checkpoint '{}'", record_file(&path).display());
    Ok(())
}

/// Load weights into a model of the matching architecture.
pub fn load_model<B: Backend>(
    model:  MeshReconModel<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<MeshReconModel<B>> {
    let path = checkpoint_stem(path);
    let record = CompactRecorder::new()
        .load(path.clone(), device)
        .with_context(|| {
            format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                record_file(&path).display())
        })?;
    Ok(model.load_record(record))
}

/// Read the configuration saved next to `checkpoint`.
pub fn load_config(checkpoint: &Path) -> Result<TrainConfig> {
    let path = config_path(checkpoint);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid config in '{}'", path.display()))
}
