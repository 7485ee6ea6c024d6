// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// The compute backend is chosen at build time by cargo feature:
//
//   wgpu     (default)  Autodiff<Wgpu>     GPU via WebGPU
//   ndarray             Autodiff<NdArray>  CPU, takes precedence
//
// Training runs on TrainBackend; evaluation runs on its inner
// backend (no autodiff graph), which is what `valid()` returns.
//
// Reference: Burn Book §2 (Backends)

use burn::tensor::backend::AutodiffBackend;

#[cfg(feature = "ndarray")]
pub type ComputeBackend = burn::backend::NdArray;
#[cfg(all(feature = "wgpu", not(feature = "ndarray")))]
pub type ComputeBackend = burn::backend::Wgpu;

#[cfg(not(any(feature = "wgpu", feature = "ndarray")))]
mod err {
    std::compile_error!("No backend selected. Enable the `wgpu` or `ndarray` feature.");

    // fall back to ndarray so the compile error above is the only one reported
    pub type ComputeBackend = burn::backend::NdArray;
}
#[cfg(not(any(feature = "wgpu", feature = "ndarray")))]
pub use err::ComputeBackend;

pub type TrainBackend = burn::backend::Autodiff<ComputeBackend>;
pub type InferBackend = <TrainBackend as AutodiffBackend>::InnerBackend;

pub fn device() -> <TrainBackend as burn::prelude::Backend>::Device {
    Default::default()
}
