// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The epoch driver talks to the training machinery only through
// TrainingPhases. The Burn-backed session implements it for real
// runs; tests implement it with canned scores so the checkpoint
// policy can be checked without a network.
//
// Note that `validate` takes `&self`: the evaluation phase has no
// way to mutate model parameters.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

/// The three things an epoch loop needs from a training session.
pub trait TrainingPhases {
    /// Run one full pass over the training stream (forward, backward,
    /// optimiser step per batch). Returns the mean training loss.
    fn train_epoch(&mut self, epoch: usize) -> Result<f64>;

    /// Run one full pass over the validation stream without gradient
    /// tracking. Returns one metric value per batch, in stream order.
    fn validate(&self) -> Result<Vec<f64>>;

    /// Persist the current model parameters at `path`.
    fn save(&self, path: &Path) -> Result<()>;
}
