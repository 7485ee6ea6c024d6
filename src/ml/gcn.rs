// ============================================================
// Layer 5 — Graph Convolution Blocks
// ============================================================
// Mesh vertices are graph nodes and mesh edges are graph edges.
// A graph convolution mixes each vertex's own feature with the
// mean of its neighbours' features:
//
//   GConv(x) = x · W_self + (Â · x) · W_neigh + b
//
// Â is the row-normalised adjacency matrix [V, V] of the stage's
// mesh, passed in batched as [B, V, V].
//
// A deformation block turns pooled image features into a
// per-vertex coordinate offset:
//
//   h     = ReLU(GConv_in(x))
//   h     = (h + ReLU(GConv_2(ReLU(GConv_1(h))))) · 0.5   × k
//   delta = GConv_out(h)                                  [B, V, 3]
//
// Reference: Kipf & Welling (2017) Graph Convolutional Networks
//            Wang et al. (2018) Pixel2Mesh §3.4

use burn::{
    nn::{Linear, LinearConfig, Relu},
    prelude::*,
};

#[derive(Module, Debug)]
pub struct GraphConv<B: Backend> {
    self_weight:  Linear<B>,
    neigh_weight: Linear<B>,
}

impl<B: Backend> GraphConv<B> {
    pub fn new(d_in: usize, d_out: usize, device: &B::Device) -> Self {
        Self {
            self_weight:  LinearConfig::new(d_in, d_out).init(device),
            neigh_weight: LinearConfig::new(d_in, d_out).with_bias(false).init(device),
        }
    }

    /// x: [B, V, d_in], adj: [B, V, V] → [B, V, d_out]
    pub fn forward(&self, x: Tensor<B, 3>, adj: Tensor<B, 3>) -> Tensor<B, 3> {
        let neighbours = adj.matmul(x.clone());
        self.self_weight.forward(x) + self.neigh_weight.forward(neighbours)
    }
}

// ─── Residual Graph Block ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResidualGConv<B: Backend> {
    g1:   GraphConv<B>,
    g2:   GraphConv<B>,
    relu: Relu,
}

impl<B: Backend> ResidualGConv<B> {
    pub fn new(dim: usize, device: &B::Device) -> Self {
        Self {
            g1:   GraphConv::new(dim, dim, device),
            g2:   GraphConv::new(dim, dim, device),
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 3>, adj: Tensor<B, 3>) -> Tensor<B, 3> {
        let h = self.relu.forward(self.g1.forward(x.clone(), adj.clone()));
        let h = self.relu.forward(self.g2.forward(h, adj));
        (x + h).mul_scalar(0.5)
    }
}

// ─── Deformation Block ────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DeformBlock<B: Backend> {
    input:  GraphConv<B>,
    blocks: Vec<ResidualGConv<B>>,
    output: GraphConv<B>,
    relu:   Relu,
}

impl<B: Backend> DeformBlock<B> {
    pub fn new(d_in: usize, hidden: usize, residual_blocks: usize, device: &B::Device) -> Self {
        Self {
            input:  GraphConv::new(d_in, hidden, device),
            blocks: (0..residual_blocks).map(|_| ResidualGConv::new(hidden, device)).collect(),
            output: GraphConv::new(hidden, 3, device),
            relu:   Relu::new(),
        }
    }

    /// Returns (coordinate offset [B, V, 3], hidden features [B, V, hidden]).
    pub fn forward(&self, x: Tensor<B, 3>, adj: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let mut h = self.relu.forward(self.input.forward(x, adj.clone()));
        for block in &self.blocks {
            h = block.forward(h, adj.clone());
        }
        let delta = self.output.forward(h.clone(), adj);
        (delta, h)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// Vertex 0 has no neighbours, vertices 1 and 2 are connected.
    fn adjacency(batch: usize) -> Tensor<TestBackend, 3> {
        let data = vec![
            0.0f32, 0.0, 0.0, //
            0.0, 0.0, 1.0, //
            0.0, 1.0, 0.0,
        ];
        Tensor::<TestBackend, 2>::from_data(TensorData::new(data, [3, 3]), &Default::default())
            .unsqueeze_dim::<3>(0)
            .repeat_dim(0, batch)
    }

    #[test]
    fn test_graph_conv_shape() {
        let device = Default::default();
        let conv = GraphConv::<TestBackend>::new(5, 7, &device);
        let out  = conv.forward(Tensor::ones([2, 3, 5], &device), adjacency(2));
        assert_eq!(out.dims(), [2, 3, 7]);
    }

    #[test]
    fn test_isolated_vertex_ignores_other_vertices() {
        let device = Default::default();
        let conv = GraphConv::<TestBackend>::new(2, 4, &device);

        let a = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 0.0, 0.0, 0.0, 0.0], [1, 3, 2]),
            &device,
        );
        let b = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, 2.0, 9.0, -4.0, 3.0, 3.0], [1, 3, 2]),
            &device,
        );

        let out_a = conv.forward(a, adjacency(1)).slice([0..1, 0..1, 0..4]);
        let out_b = conv.forward(b, adjacency(1)).slice([0..1, 0..1, 0..4]);
        let diff: f32 = (out_a - out_b).abs().sum().into_scalar().elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_deform_block_shapes() {
        let device = Default::default();
        let block  = DeformBlock::<TestBackend>::new(6, 8, 2, &device);
        let (delta, hidden) = block.forward(Tensor::ones([1, 3, 6], &device), adjacency(1));
        assert_eq!(delta.dims(), [1, 3, 3]);
        assert_eq!(hidden.dims(), [1, 3, 8]);
    }
}
