// ============================================================
// Layer 5 — Camera Projection and Feature Pooling
// ============================================================
// Projects mesh vertices into the image and samples encoder
// features at the projected positions.
//
// Pinhole projection, camera looking down -Z:
//
//   depth = max(-Z, ε)
//   row   = -f_y · Y / depth + c_y
//   col   =  f_x · X / depth + c_x
//
// Both are clamped to the image. For a feature map of size
// Hf × Wf the pixel position is rescaled by Hf / S, Wf / S and
// the feature is interpolated bilinearly from the four
// surrounding cells. Interpolation weights stay in the autodiff
// graph, so gradients flow back into the vertex positions.
//
// Reference: Wang et al. (2018) Pixel2Mesh §3.3
//            Hartley & Zisserman, Multiple View Geometry §6

use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest depth used in the perspective division
const MIN_DEPTH: f64 = 1e-2;

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Principal point (column, row)
    pub c: [f64; 2],
    /// Focal length (column, row)
    pub f: [f64; 2],
}

impl Default for Camera {
    fn default() -> Self {
        Self { c: [112.0, 112.0], f: [250.0, 250.0] }
    }
}

/// coords: [B, V, 3] → (rows, cols), each [B, V], in pixels of an S × S image.
pub fn project<B: Backend>(coords: Tensor<B, 3>, camera: &Camera, image_size: usize) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [b, v, _] = coords.dims();
    let axis = |k: usize| coords.clone().slice([0..b, 0..v, k..k + 1]).reshape([b, v]);
    let (x, y, z) = (axis(0), axis(1), axis(2));

    let max = (image_size - 1) as f64;
    let depth = z.neg().clamp_min(MIN_DEPTH);
    let rows = y.neg().div(depth.clone()).mul_scalar(camera.f[1]).add_scalar(camera.c[1]).clamp(0.0, max);
    let cols = x.div(depth).mul_scalar(camera.f[0]).add_scalar(camera.c[0]).clamp(0.0, max);
    (rows, cols)
}

/// Bilinear sample of `map` [B, C, Hf, Wf] at pixel positions of an S × S image.
/// Returns [B, V, C].
pub fn bilinear_sample<B: Backend>(
    map:        Tensor<B, 4>,
    rows:       Tensor<B, 2>,
    cols:       Tensor<B, 2>,
    image_size: usize,
) -> Tensor<B, 3> {
    let [b, c, hf, wf] = map.dims();
    let [_, v] = rows.dims();

    let y = rows.mul_scalar(hf as f64 / image_size as f64).clamp(0.0, (hf - 1) as f64);
    let x = cols.mul_scalar(wf as f64 / image_size as f64).clamp(0.0, (wf - 1) as f64);

    // Coordinates are non-negative, so truncation is floor
    let y0 = y.clone().int();
    let x0 = x.clone().int();
    let y1 = y0.clone().add_scalar(1).clamp_max(hf as i64 - 1);
    let x1 = x0.clone().add_scalar(1).clamp_max(wf as i64 - 1);

    // Weights use the unclamped upper corner so they always sum to one
    let dy1 = y0.clone().float().add_scalar(1.0) - y.clone();
    let dx1 = x0.clone().float().add_scalar(1.0) - x.clone();
    let dy0 = y - y0.clone().float();
    let dx0 = x - x0.clone().float();

    let flat = map.reshape([b, c, hf * wf]);
    let at = |yi: Tensor<B, 2, Int>, xi: Tensor<B, 2, Int>| -> Tensor<B, 3> {
        let idx = yi.mul_scalar(wf as i64).add(xi).reshape([b, 1, v]).repeat_dim(1, c);
        flat.clone().gather(2, idx)
    };
    let weight = |a: Tensor<B, 2>, w: Tensor<B, 2>| a.mul(w).reshape([b, 1, v]);

    let sampled = at(y0.clone(), x0.clone()) * weight(dy1.clone(), dx1.clone())
        + at(y0, x1.clone()) * weight(dy1, dx0.clone())
        + at(y1.clone(), x0) * weight(dy0.clone(), dx1)
        + at(y1, x1) * weight(dy0, dx0);

    sampled.swap_dims(1, 2)
}

/// Perceptual feature pooling: sample every feature map at the projected
/// vertices and append the raw coordinates. Returns [B, V, ΣC + 3].
pub fn pool_features<B: Backend>(
    maps:       &[Tensor<B, 4>],
    coords:     Tensor<B, 3>,
    camera:     &Camera,
    image_size: usize,
) -> Tensor<B, 3> {
    let (rows, cols) = project(coords.clone(), camera, image_size);
    let mut parts: Vec<Tensor<B, 3>> = maps
        .iter()
        .map(|m| bilinear_sample(m.clone(), rows.clone(), cols.clone(), image_size))
        .collect();
    parts.push(coords);
    Tensor::cat(parts, 2)
}
