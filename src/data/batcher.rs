// ============================================================
// Layer 4 — Mesh Batcher
// ============================================================
// Implements Burn's Batcher trait to stack MeshSamples into
// device tensors.
//
// Output shapes (N = batch size, S = image size, P = points):
//   images:  [N, 3, S, S]
//   points:  [N, P, 3]
//   normals: [N, P, 3]
//
// Point clouds of different samples usually differ in size.
// Tensors need a common P, so every cloud in the batch is cut
// to the smallest count in that batch. With the default batch
// size of 1 nothing is ever dropped.
//
// Tensors are created directly on the device the DataLoader
// hands in, so batches arrive ready for the model.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::sample::MeshSample;

#[derive(Debug, Clone)]
pub struct MeshBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    pub points:  Tensor<B, 3>,
    pub normals: Tensor<B, 3>,
}

impl<B: Backend> MeshBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshBatcher;

impl MeshBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, MeshSample, MeshBatch<B>> for MeshBatcher {
    fn batch(&self, items: Vec<MeshSample>, device: &B::Device) -> MeshBatch<B> {
        let batch_size = items.len();
        let size       = items[0].image_size;
        let n_points   = items.iter().map(MeshSample::point_count).min().unwrap_or(0);

        if items.iter().any(|s| s.point_count() != n_points) {
            tracing::debug!("Truncating point clouds in batch to {} points", n_points);
        }

        let mut images  = Vec::with_capacity(batch_size * 3 * size * size);
        let mut points:  Vec<f32> = Vec::with_capacity(batch_size * n_points * 3);
        let mut normals: Vec<f32> = Vec::with_capacity(batch_size * n_points * 3);

        for item in &items {
            images.extend_from_slice(&item.image);
            points.extend(item.points[..n_points].iter().flatten());
            normals.extend(item.normals[..n_points].iter().flatten());
        }

        let images = TensorData::new(images, [batch_size, 3, size, size]).convert::<B::FloatElem>();
        let points = TensorData::new(points, [batch_size, n_points, 3]).convert::<B::FloatElem>();
        let normals = TensorData::new(normals, [batch_size, n_points, 3]).convert::<B::FloatElem>();

        MeshBatch {
            images:  Tensor::from_data(images, device),
            points:  Tensor::from_data(points, device),
            normals: Tensor::from_data(normals, device),
        }
    }
}
