// ============================================================
// Layer 5 — Mesh Losses
// ============================================================
// Every deformation stage is supervised with five terms:
//
//   chamfer   mean_p min_g ‖p − g‖²  +  0.55 · mean_g min_p ‖g − p‖²
//   normal    mean over edges (a, b) of |cos(p_b − p_a, n(a))|,
//             n(a) = normal of the ground-truth point nearest to p_a
//   edge      mean ‖p_b − p_a‖² over edges
//   laplace   mean ‖δ_after − δ_before‖²,  δ(x) = x − Â·x
//   move      mean ‖after − before‖²  (stages after the first)
//
// The chamfer term pulls vertices onto the surface; the others
// keep the mesh smooth and evenly spaced while it deforms.
//
// Reference: Wang et al. (2018) Pixel2Mesh §3.5
//            Fan et al. (2017) Point Set Generation Network

use burn::prelude::*;

use crate::ml::metric::pairwise_sq_distances;

const NORM_EPS: f64 = 1e-12;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct LossWeights {
    #[config(default = 1.0)]
    pub chamfer:          f64,
    /// Weight of the ground-truth → prediction direction inside the chamfer term
    #[config(default = 0.55)]
    pub chamfer_opposite: f64,
    #[config(default = 1.6e-4)]
    pub normal:           f64,
    #[config(default = 0.3)]
    pub edge:             f64,
    #[config(default = 0.5)]
    pub laplace:          f64,
    /// Per-stage multiplier of the laplace weight
    #[config(default = "vec![0.2, 1.0, 1.0]")]
    pub laplace_stage:    Vec<f64>,
    #[config(default = 0.1)]
    pub displacement:     f64,
}

impl LossWeights {
    pub fn laplace_for_stage(&self, stage: usize) -> f64 {
        self.laplace * self.laplace_stage.get(stage).copied().unwrap_or(1.0)
    }
}

/// Both chamfer directions plus, for every predicted vertex, the index
/// of its nearest ground-truth point ([B, V, 1]).
pub struct ChamferTerms<B: Backend> {
    pub forward:  Tensor<B, 1>,
    pub backward: Tensor<B, 1>,
    pub nearest:  Tensor<B, 3, Int>,
}

/// pred: [B, V, 3], gt: [B, P, 3]
pub fn chamfer<B: Backend>(pred: Tensor<B, 3>, gt: Tensor<B, 3>) -> ChamferTerms<B> {
    let dist = pairwise_sq_distances(pred, gt); // [B, V, P]
    ChamferTerms {
        forward:  dist.clone().min_dim(2).mean(),
        backward: dist.clone().min_dim(1).mean(),
        nearest:  dist.argmin(2),
    }
}

fn edge_vectors<B: Backend>(coords: Tensor<B, 3>, a: Tensor<B, 1, Int>, b: Tensor<B, 1, Int>) -> Tensor<B, 3> {
    coords.clone().select(1, b) - coords.select(1, a)
}

fn normalize<B: Backend>(v: Tensor<B, 3>) -> Tensor<B, 3> {
    let len = v.clone().powf_scalar(2.0).sum_dim(2).sqrt().clamp_min(NORM_EPS);
    v.div(len)
}

/// Mean |cos| between each predicted edge and the ground-truth normal
/// at the edge's first endpoint.
pub fn normal_loss<B: Backend>(
    pred:       Tensor<B, 3>,
    gt_normals: Tensor<B, 3>,
    nearest:    Tensor<B, 3, Int>,
    edges_a:    Tensor<B, 1, Int>,
    edges_b:    Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let vertex_normals = gt_normals.gather(1, nearest.repeat_dim(2, 3)); // [B, V, 3]
    let normals_a = normalize(vertex_normals.select(1, edges_a.clone()));
    let edges     = normalize(edge_vectors(pred, edges_a, edges_b));
    (edges * normals_a).sum_dim(2).abs().mean()
}

pub fn edge_loss<B: Backend>(pred: Tensor<B, 3>, edges_a: Tensor<B, 1, Int>, edges_b: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    edge_vectors(pred, edges_a, edges_b).powf_scalar(2.0).sum_dim(2).mean()
}

/// Laplacian coordinates x − Â·x. adj: [B, V, V]
pub fn laplacian<B: Backend>(coords: Tensor<B, 3>, adj: Tensor<B, 3>) -> Tensor<B, 3> {
    coords.clone() - adj.matmul(coords)
}

pub fn laplace_loss<B: Backend>(before: Tensor<B, 3>, after: Tensor<B, 3>, adj: Tensor<B, 3>) -> Tensor<B, 1> {
    let diff = laplacian(after, adj.clone()) - laplacian(before, adj);
    diff.powf_scalar(2.0).sum_dim(2).mean()
}

pub fn move_loss<B: Backend>(before: Tensor<B, 3>, after: Tensor<B, 3>) -> Tensor<B, 1> {
    (after - before).powf_scalar(2.0).sum_dim(2).mean()
}
