// ============================================================
// Layer 3 — Mesh Template Domain Type
// ============================================================
// A triangle mesh as plain Rust data: vertex positions plus
// triangle indices. The model starts from a template mesh
// (an ellipsoid) and deforms it stage by stage, refining the
// surface between stages by edge-midpoint subdivision.
//
// Subdivision ("graph unpooling"):
//   - every unique edge (a, b) gets a new vertex at its midpoint
//   - every triangle (a, b, c) is split into four:
//
//              a
//             / \
//           ab---ca
//           / \ / \
//          b---bc--c
//
//   The new vertex for edge (a, b) is the mean of its two parents,
//   which is exactly how hidden features are unpooled as well.
//
// Reference: Wang et al. (2018) Pixel2Mesh
//            Rust Book §8 (Collections)

use anyhow::{bail, ensure, Result};
use std::collections::BTreeMap;

/// A triangle mesh: vertices and faces indexing into them.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTemplate {
    pub vertices: Vec<[f32; 3]>,
    pub faces:    Vec<[u32; 3]>,
}

impl MeshTemplate {
    /// Build a template, rejecting empty meshes and out-of-range face indices.
    pub fn new(vertices: Vec<[f32; 3]>, faces: Vec<[u32; 3]>) -> Result<Self> {
        ensure!(!vertices.is_empty(), "mesh template has no vertices");
        ensure!(!faces.is_empty(), "mesh template has no faces");

        let n = vertices.len();
        for (i, face) in faces.iter().enumerate() {
            if let Some(bad) = face.iter().find(|&&v| v as usize >= n) {
                bail!("face {i} references vertex {bad} but the mesh has {n} vertices");
            }
        }
        Ok(Self { vertices, faces })
    }

    /// UV ellipsoid centred at `center` with the given radii.
    ///
    /// `rings` is the number of latitude bands (>= 2) and `segments`
    /// the number of longitude slices (>= 3). The result has
    /// `2 + (rings - 1) * segments` vertices and `2 * segments * (rings - 1)` faces.
    pub fn ellipsoid(rings: usize, segments: usize, radii: [f32; 3], center: [f32; 3]) -> Result<Self> {
        ensure!(rings >= 2, "an ellipsoid needs at least 2 rings, got {rings}");
        ensure!(segments >= 3, "an ellipsoid needs at least 3 segments, got {segments}");

        let point = |theta: f32, phi: f32| -> [f32; 3] {
            [
                center[0] + radii[0] * theta.sin() * phi.cos(),
                center[1] + radii[1] * theta.cos(),
                center[2] + radii[2] * theta.sin() * phi.sin(),
            ]
        };

        let mut vertices = Vec::with_capacity(2 + (rings - 1) * segments);
        vertices.push(point(0.0, 0.0));
        for ring in 1..rings {
            let theta = std::f32::consts::PI * ring as f32 / rings as f32;
            for seg in 0..segments {
                let phi = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
                vertices.push(point(theta, phi));
            }
        }
        vertices.push(point(std::f32::consts::PI, 0.0));

        let top    = 0u32;
        let bottom = (vertices.len() - 1) as u32;
        // Index of vertex `seg` on interior ring `ring` (1-based ring)
        let at = |ring: usize, seg: usize| -> u32 { (1 + (ring - 1) * segments + seg % segments) as u32 };

        let mut faces = Vec::with_capacity(2 * segments * (rings - 1));
        for seg in 0..segments {
            faces.push([top, at(1, seg + 1), at(1, seg)]);
        }
        for ring in 1..rings - 1 {
            for seg in 0..segments {
                let a = at(ring, seg);
                let b = at(ring, seg + 1);
                let c = at(ring + 1, seg);
                let d = at(ring + 1, seg + 1);
                faces.push([a, b, d]);
                faces.push([a, d, c]);
            }
        }
        for seg in 0..segments {
            faces.push([bottom, at(rings - 1, seg), at(rings - 1, seg + 1)]);
        }

        Self::new(vertices, faces)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Unique undirected edges as `(a, b)` with `a < b`, sorted.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<(u32, u32)> = self
            .faces
            .iter()
            .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
            .map(|(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Per-vertex neighbour lists, sorted and without duplicates.
    pub fn neighbors(&self) -> Vec<Vec<u32>> {
        let mut out = vec![Vec::new(); self.vertices.len()];
        for (a, b) in self.edges() {
            out[a as usize].push(b);
            out[b as usize].push(a);
        }
        for list in &mut out {
            list.sort_unstable();
        }
        out
    }

    /// Row-normalised adjacency matrix, dense and row-major `[V, V]`.
    /// Row `i` averages the neighbours of vertex `i`; isolated vertices get a zero row.
    pub fn mean_adjacency(&self) -> Vec<f32> {
        let n = self.vertices.len();
        let mut dense = vec![0.0f32; n * n];
        for (i, list) in self.neighbors().iter().enumerate() {
            if list.is_empty() {
                continue;
            }
            let w = 1.0 / list.len() as f32;
            for &j in list {
                dense[i * n + j as usize] = w;
            }
        }
        dense
    }

    /// Split every triangle into four through edge midpoints.
    ///
    /// Returns the refined mesh and, for every vertex added, the pair of
    /// parent vertices it was created from (in new-vertex order).
    pub fn subdivide(&self) -> (MeshTemplate, Vec<(u32, u32)>) {
        let base = self.vertices.len() as u32;
        let mut midpoint: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        let mut parents = Vec::new();
        let mut vertices = self.vertices.clone();

        let mut mid = |a: u32, b: u32| -> u32 {
            let key = if a < b { (a, b) } else { (b, a) };
            *midpoint.entry(key).or_insert_with(|| {
                let (pa, pb) = (self.vertices[key.0 as usize], self.vertices[key.1 as usize]);
                vertices.push([
                    0.5 * (pa[0] + pb[0]),
                    0.5 * (pa[1] + pb[1]),
                    0.5 * (pa[2] + pb[2]),
                ]);
                parents.push(key);
                base + parents.len() as u32 - 1
            })
        };

        let mut faces = Vec::with_capacity(self.faces.len() * 4);
        for &[a, b, c] in &self.faces {
            let ab = mid(a, b);
            let bc = mid(b, c);
            let ca = mid(c, a);
            faces.push([a, ab, ca]);
            faces.push([ab, b, bc]);
            faces.push([ca, bc, c]);
            faces.push([ab, bc, ca]);
        }

        (MeshTemplate { vertices, faces }, parents)
    }
}

// ─── MeshHierarchy ────────────────────────────────────────────────────────────
/// The meshes used by each deformation stage.
/// Stage 0 is the template itself; stage i+1 is stage i subdivided once.
#[derive(Debug, Clone)]
pub struct MeshHierarchy {
    pub stages:  Vec<MeshTemplate>,
    /// `unpool[i]` lists the parent pairs that take stage i to stage i+1
    pub unpool:  Vec<Vec<(u32, u32)>>,
}

impl MeshHierarchy {
    pub fn new(template: MeshTemplate, stages: usize) -> Self {
        let mut meshes = vec![template];
        let mut unpool = Vec::new();
        for _ in 1..stages.max(1) {
            let (finer, parents) = meshes[meshes.len() - 1].subdivide();
            meshes.push(finer);
            unpool.push(parents);
        }
        Self { stages: meshes, unpool }
    }

    pub fn final_mesh(&self) -> &MeshTemplate {
        &self.stages[self.stages.len() - 1]
    }

    /// Dense `[V_next, V_prev]` unpooling matrix for stage transition `i`:
    /// identity on the old vertices, 0.5/0.5 on the parents of new ones.
    pub fn unpool_matrix(&self, i: usize) -> Vec<f32> {
        let prev = self.stages[i].vertex_count();
        let next = self.stages[i + 1].vertex_count();
        let mut dense = vec![0.0f32; next * prev];
        for v in 0..prev {
            dense[v * prev + v] = 1.0;
        }
        for (k, &(a, b)) in self.unpool[i].iter().enumerate() {
            let row = prev + k;
            dense[row * prev + a as usize] = 0.5;
            dense[row * prev + b as usize] = 0.5;
        }
        dense
    }
}
