// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system
// works with:
//
//   sample.rs — one (image, points, normals) training sample
//   mesh.rs   — triangle mesh templates and their subdivision
//   score.rs  — per-epoch score aggregation and best-so-far state
//   traits.rs — the TrainingPhases seam used by the epoch driver
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// A single training sample
pub mod sample;

/// Triangle mesh templates, subdivision and adjacency
pub mod mesh;

/// Mean aggregation and best-score tracking
pub mod score;

/// Core abstractions (traits) that other layers implement
pub mod traits;
