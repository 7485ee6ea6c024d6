// ============================================================
// Layer 5 — Point-Cloud Metric (F-score)
// ============================================================
// Symmetric similarity between a predicted and a ground-truth
// point set, based on nearest-neighbour distances:
//
//   precision = fraction of predicted points whose nearest
//               ground-truth point is closer than tau
//   recall    = fraction of ground-truth points whose nearest
//               predicted point is closer than tau
//   F         = 2·P·R / (P + R)        (0 when P + R = 0)
//
// Distances are squared Euclidean, so tau is a squared
// threshold (1e-4 ≙ 1 cm at ShapeNet scale).
//
// Reference: Tatarchenko et al. (2019) What Do Single-view 3D
//            Reconstruction Networks Learn?

use burn::prelude::*;

pub const DEFAULT_FSCORE_THRESHOLD: f64 = 1e-4;

/// Squared distances between every pair of points.
/// a: [B, N, 3], b: [B, M, 3] → [B, N, M]
pub fn pairwise_sq_distances<B: Backend>(a: Tensor<B, 3>, b: Tensor<B, 3>) -> Tensor<B, 3> {
    let a_sq = a.clone().powf_scalar(2.0).sum_dim(2); // [B, N, 1]
    let b_sq = b.clone().powf_scalar(2.0).sum_dim(2).swap_dims(1, 2); // [B, 1, M]
    let cross = a.matmul(b.swap_dims(1, 2)); // [B, N, M]
    (a_sq + b_sq - cross.mul_scalar(2.0)).clamp_min(0.0)
}

/// F-score per batch element, averaged over the batch.
pub fn f_score<B: Backend>(pred: Tensor<B, 3>, gt: Tensor<B, 3>, threshold: f64) -> f64 {
    let dist = pairwise_sq_distances(pred, gt);
    let [batch, _, _] = dist.dims();

    let precision = dist
        .clone()
        .min_dim(2)
        .lower_elem(threshold)
        .float()
        .mean_dim(1)
        .reshape([batch]);
    let recall = dist
        .min_dim(1)
        .lower_elem(threshold)
        .float()
        .mean_dim(2)
        .reshape([batch]);

    let numerator   = precision.clone().mul(recall.clone()).mul_scalar(2.0);
    let denominator = (precision + recall).clamp_min(f32::EPSILON);
    numerator.div(denominator).mean().into_scalar().elem::<f64>()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn cloud(points: &[[f32; 3]]) -> Tensor<TestBackend, 3> {
        let flat: Vec<f32> = points.iter().flatten().copied().collect();
        Tensor::from_data(TensorData::new(flat, [1, points.len(), 3]), &Default::default())
    }

    #[test]
    fn test_pairwise_distances() {
        let d = pairwise_sq_distances(cloud(&[[0.0, 0.0, 0.0]]), cloud(&[[1.0, 2.0, 2.0], [0.0, 0.0, 0.0]]));
        let v: Vec<f32> = d.into_data().convert::<f32>().to_vec().unwrap();
        assert!((v[0] - 9.0).abs() < 1e-5);
        assert!(v[1].abs() < 1e-6);
    }

    #[test]
    fn test_identical_clouds_score_one() {
        let pts = [[0.0, 0.0, -0.8], [0.1, 0.0, -0.8], [0.0, 0.2, -0.7]];
        let f = f_score(cloud(&pts), cloud(&pts), DEFAULT_FSCORE_THRESHOLD);
        assert!((f - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_clouds_score_zero() {
        let f = f_score(
            cloud(&[[0.0, 0.0, 0.0], [0.0, 0.1, 0.0]]),
            cloud(&[[5.0, 5.0, 5.0]]),
            DEFAULT_FSCORE_THRESHOLD,
        );
        assert_eq!(f, 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // One of two predicted points is on target → precision 0.5
        // The single ground-truth point is matched → recall 1
        let pred = cloud(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        let gt   = cloud(&[[0.0, 0.0, 0.0]]);
        let f = f_score(pred, gt, DEFAULT_FSCORE_THRESHOLD);
        // 2 * 0.5 * 1 / 1.5
        assert!((f - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_symmetric() {
        let a = [[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 0.001, 0.0]];
        let b = [[0.0, 0.0, 0.0], [0.0, 0.0, 7.0]];
        let ab = f_score(cloud(&a), cloud(&b), DEFAULT_FSCORE_THRESHOLD);
        let ba = f_score(cloud(&b), cloud(&a), DEFAULT_FSCORE_THRESHOLD);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_controls_match() {
        let pred = cloud(&[[0.0, 0.0, 0.0]]);
        let gt   = cloud(&[[0.05, 0.0, 0.0]]);
        // squared distance 0.0025
        assert_eq!(f_score(pred.clone(), gt.clone(), 1e-3), 0.0);
        assert!((f_score(pred, gt, 1e-2) - 1.0).abs() < 1e-6);
    }
}
