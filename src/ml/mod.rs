// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds or runs a Burn operator graph lives
// here; the other layers hand it plain data.
//
// What's in this layer:
//
//   backend.rs    — Cargo-feature backend selection
//                   (Autodiff<Wgpu> or Autodiff<NdArray>)
//
//   encoder.rs    — VGG-style CNN producing a feature pyramid
//
//   projection.rs — Camera projection of vertices and
//                   bilinear sampling of the feature maps
//
//   gcn.rs        — Graph convolutions and deformation blocks
//
//   model.rs      — The three-stage mesh deformation network:
//                   • ellipsoid template as seed geometry
//                   • perceptual feature pooling per stage
//                   • graph unpooling between stages
//
//   loss.rs       — Chamfer, normal, edge, laplacian and move
//                   terms
//
//   metric.rs     — Point-cloud F-score
//
//   session.rs    — Data loaders plus one training / validation
//                   pass (implements TrainingPhases)
//
//   trainer.rs    — The epoch loop with best-score checkpointing
//
//   inferencer.rs — Loads a checkpoint for evaluate / predict
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Wang et al. (2018) Pixel2Mesh

/// Build-time backend choice
pub mod backend;

/// Image feature pyramid
pub mod encoder;

/// Vertex projection and perceptual feature pooling
pub mod projection;

/// Graph convolution building blocks
pub mod gcn;

/// Mesh deformation network
pub mod model;

/// Per-stage mesh losses
pub mod loss;

/// F-score between point sets
pub mod metric;

/// Burn-backed training phases
pub mod session;

/// Epoch loop with validation and checkpointing
pub mod trainer;

/// Checkpoint-backed evaluation and prediction
pub mod inferencer;
