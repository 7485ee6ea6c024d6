// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from files on disk all the
// way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   manifest (.txt)
//       │
//       ▼
//   manifest.rs      → sample stems, in file order
//       │
//       ▼
//   SampleLoader     → reads <stem>.png and <stem>.xyz
//       │
//       ▼
//   ImageTransform   → resize, scale, ImageNet-normalise
//       │
//       ▼
//   ShapeNetDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   MeshBatcher      → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader       → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Parses sample manifests
pub mod manifest;

/// Image resize + normalisation
pub mod preprocessor;

/// Reads one sample's image and point files
pub mod loader;

/// Implements Burn's Dataset trait for mesh samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
