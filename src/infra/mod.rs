// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to one business
// layer:
//
//   checkpoint.rs — Saving and loading model weights
//                   Burn's CompactRecorder under a run-fixed
//                   file name, plus the run config as JSON so
//                   evaluate/predict can rebuild the model.
//
//   metrics.rs    — One CSV row per epoch (loss, F-score,
//                   best F-score, whether a checkpoint was
//                   written).
//
//   profiler.rs   — Optional per-step phase timings.
//
//   mesh_io.rs    — Template meshes in (PLY, OBJ) and
//                   predicted meshes out (OBJ).
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Per-step phase timing tables
pub mod profiler;

/// PLY / OBJ reading and OBJ writing
pub mod mesh_io;
