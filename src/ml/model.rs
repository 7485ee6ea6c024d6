// ============================================================
// Layer 5 — Mesh Reconstruction Model
// ============================================================
// Single image → triangle mesh, coarse to fine.
//
//   image ──► ImageEncoder ──► feature maps (1/2 … 1/16)
//                                   │
//   template ─► project + pool ─► DeformBlock 0 ─► mesh 0
//                                   │ unpool (subdivide)
//               project + pool ─► DeformBlock 1 ─► mesh 1
//                                   │ unpool
//               project + pool ─► DeformBlock 2 ─► mesh 2  (output)
//
// Stage 0 sees the pooled image features and the vertex
// coordinates; later stages also get the previous stage's hidden
// features, unpooled onto the finer mesh.
//
// Mesh topology (adjacency, unpooling, edges) is fixed at
// construction and held as constant tensors; only the encoder
// and the graph convolutions carry parameters. Camera and loss
// weights ride along as `Ignored` (not part of the record).
//
// Two entry points:
//   forward       — any backend; used on the valid() model
//   forward_loss  — autodiff backend; prediction plus scalar loss
//
// Reference: Wang et al. (2018) Pixel2Mesh
//            Burn Book §3 (Building Blocks)

use anyhow::{ensure, Result};
use burn::{module::Ignored, prelude::*, tensor::backend::AutodiffBackend};

use crate::domain::mesh::{MeshHierarchy, MeshTemplate};
use crate::ml::{
    encoder::ImageEncoder,
    gcn::DeformBlock,
    loss::{self, LossWeights},
    projection::{pool_features, Camera},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct MeshReconConfig {
    #[config(default = 224)]
    pub image_size:       usize,
    #[config(default = "Camera::default()")]
    pub camera:           Camera,
    #[config(default = "vec![16, 32, 64, 128]")]
    pub encoder_channels: Vec<usize>,
    #[config(default = 192)]
    pub hidden_dim:       usize,
    #[config(default = 6)]
    pub residual_blocks:  usize,
    #[config(default = 3)]
    pub stages:           usize,
    #[config(default = "LossWeights::new()")]
    pub loss:             LossWeights,
}

impl MeshReconConfig {
    /// Build a model whose deformation stages run on the meshes of `hierarchy`.
    pub fn init<B: Backend>(&self, hierarchy: &MeshHierarchy, device: &B::Device) -> Result<MeshReconModel<B>> {
        ensure!(self.stages >= 1, "the model needs at least one deformation stage");
        ensure!(
            hierarchy.stages.len() == self.stages,
            "mesh hierarchy has {} levels but the model has {} stages",
            hierarchy.stages.len(),
            self.stages
        );
        ensure!(!self.encoder_channels.is_empty(), "encoder needs at least one stage");

        let pooled_dim = self.encoder_channels.iter().sum::<usize>() + 3;
        let blocks = (0..self.stages)
            .map(|i| {
                let d_in = if i == 0 { pooled_dim } else { pooled_dim + self.hidden_dim };
                DeformBlock::new(d_in, self.hidden_dim, self.residual_blocks, device)
            })
            .collect();

        let template = &hierarchy.stages[0];
        let template = constant(
            template.vertices.iter().flatten().copied().collect(),
            [template.vertex_count(), 3],
            device,
        );

        let mut adjacency = Vec::with_capacity(self.stages);
        let mut edges_a   = Vec::with_capacity(self.stages);
        let mut edges_b   = Vec::with_capacity(self.stages);
        for mesh in &hierarchy.stages {
            let v = mesh.vertex_count();
            adjacency.push(constant(mesh.mean_adjacency(), [v, v], device));
            let (a, b) = edge_indices(mesh, device);
            edges_a.push(a);
            edges_b.push(b);
        }

        let unpool = (0..self.stages - 1)
            .map(|i| {
                let rows = hierarchy.stages[i + 1].vertex_count();
                let cols = hierarchy.stages[i].vertex_count();
                constant(hierarchy.unpool_matrix(i), [rows, cols], device)
            })
            .collect();

        Ok(MeshReconModel {
            encoder: ImageEncoder::new(&self.encoder_channels, device),
            blocks,
            template,
            adjacency,
            unpool,
            edges_a,
            edges_b,
            camera:     Ignored(self.camera),
            image_size: self.image_size,
            weights:    Ignored(self.loss.clone()),
        })
    }
}

fn constant<B: Backend>(values: Vec<f32>, shape: [usize; 2], device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(values, shape).convert::<B::FloatElem>(), device)
}

fn edge_indices<B: Backend>(mesh: &MeshTemplate, device: &B::Device) -> (Tensor<B, 1, Int>, Tensor<B, 1, Int>) {
    let (a, b): (Vec<i64>, Vec<i64>) = mesh.edges().into_iter().map(|(a, b)| (a as i64, b as i64)).unzip();
    let n = a.len();
    (
        Tensor::from_data(TensorData::new(a, [n]).convert::<B::IntElem>(), device),
        Tensor::from_data(TensorData::new(b, [n]).convert::<B::IntElem>(), device),
    )
}

/// [R, C] → [batch, R, C]
fn batched<B: Backend>(matrix: Tensor<B, 2>, batch: usize) -> Tensor<B, 3> {
    matrix.unsqueeze_dim::<3>(0).repeat_dim(0, batch)
}

#[derive(Module, Debug)]
pub struct MeshReconModel<B: Backend> {
    encoder:   ImageEncoder<B>,
    blocks:    Vec<DeformBlock<B>>,
    /// Stage-0 vertex positions [V0, 3]
    template:  Tensor<B, 2>,
    /// Row-normalised adjacency per stage [Vi, Vi]
    adjacency: Vec<Tensor<B, 2>>,
    /// Unpooling from stage i to i+1 [Vi+1, Vi]
    unpool:    Vec<Tensor<B, 2>>,
    edges_a:   Vec<Tensor<B, 1, Int>>,
    edges_b:   Vec<Tensor<B, 1, Int>>,
    camera:     Ignored<Camera>,
    image_size: usize,
    weights:    Ignored<LossWeights>,
}

/// Vertex positions entering and leaving one deformation stage.
#[derive(Debug, Clone)]
pub struct StageOutput<B: Backend> {
    pub before: Tensor<B, 3>,
    pub after:  Tensor<B, 3>,
}

#[derive(Debug, Clone)]
pub struct MeshPrediction<B: Backend> {
    pub stages:   Vec<StageOutput<B>>,
    /// Final-stage vertices [B, V, 3]
    pub vertices: Tensor<B, 3>,
}

impl<B: Backend> MeshReconModel<B> {
    pub fn stage_count(&self) -> usize {
        self.blocks.len()
    }

    /// images: [B, 3, S, S] → predicted mesh after every stage
    pub fn forward(&self, images: Tensor<B, 4>) -> MeshPrediction<B> {
        let batch = images.dims()[0];
        let maps  = self.encoder.forward(images);

        let mut coords = batched(self.template.clone(), batch);
        let mut hidden: Option<Tensor<B, 3>> = None;
        let mut stages = Vec::with_capacity(self.blocks.len());

        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                let up = batched(self.unpool[i - 1].clone(), batch);
                coords = up.clone().matmul(coords);
                hidden = hidden.map(|h| up.matmul(h));
            }

            let pooled = pool_features(&maps, coords.clone(), &self.camera.0, self.image_size);
            let input  = match hidden.take() {
                Some(h) => Tensor::cat(vec![pooled, h], 2),
                None    => pooled,
            };

            let (delta, h) = block.forward(input, batched(self.adjacency[i].clone(), batch));
            let after = coords.clone() + delta;
            stages.push(StageOutput { before: coords, after: after.clone() });
            coords = after;
            hidden = Some(h);
        }

        MeshPrediction { stages, vertices: coords }
    }

    /// Weighted sum of the per-stage losses against (points, normals), both [B, P, 3].
    pub fn loss(&self, prediction: &MeshPrediction<B>, points: Tensor<B, 3>, normals: Tensor<B, 3>) -> Tensor<B, 1> {
        let w = &self.weights.0;
        let device = points.device();
        let mut total = Tensor::<B, 1>::zeros([1], &device);

        for (i, stage) in prediction.stages.iter().enumerate() {
            let batch = stage.after.dims()[0];
            let adj   = batched(self.adjacency[i].clone(), batch);

            let terms = loss::chamfer(stage.after.clone(), points.clone());
            total = total
                + terms.forward.mul_scalar(w.chamfer)
                + terms.backward.mul_scalar(w.chamfer * w.chamfer_opposite);

            let normal = loss::normal_loss(
                stage.after.clone(),
                normals.clone(),
                terms.nearest,
                self.edges_a[i].clone(),
                self.edges_b[i].clone(),
            );
            let edge    = loss::edge_loss(stage.after.clone(), self.edges_a[i].clone(), self.edges_b[i].clone());
            let laplace = loss::laplace_loss(stage.before.clone(), stage.after.clone(), adj);

            total = total
                + normal.mul_scalar(w.normal)
                + edge.mul_scalar(w.edge)
                + laplace.mul_scalar(w.laplace_for_stage(i));

            if i > 0 {
                total = total + loss::move_loss(stage.before.clone(), stage.after.clone()).mul_scalar(w.displacement);
            }
        }
        total
    }

    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        points:  Tensor<B, 3>,
        normals: Tensor<B, 3>,
    ) -> (Tensor<B, 1>, MeshPrediction<B>)
    where
        B: AutodiffBackend,
    {
        let prediction = self.forward(images);
        let loss = self.loss(&prediction, points, normals);
        (loss, prediction)
    }
}
