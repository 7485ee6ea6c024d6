// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal: train, evaluate a checkpoint, or predict a mesh.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No console contract lines here (that's Layer 1 and the
//     epoch driver)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow and its configuration
pub mod train_use_case;

// Score a saved checkpoint on a split
pub mod evaluate_use_case;

// Reconstruct one image into an OBJ file
pub mod predict_use_case;
