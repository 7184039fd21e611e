//! Assembly of the Poisson system `A x = B` over an active region.
//!
//! `A` is the graph Laplacian of the active pixels (degree on the diagonal,
//! `-1` between active 4-neighbors). It depends only on the region topology.
//! `B` has one column per color channel and folds in the Dirichlet boundary
//! colors of the target together with the gradient field chosen by a
//! [`GradientPolicy`]; it depends on the images and the offset.

use crate::poisson::active_region::ActiveRegion;
use crate::poisson::gradient::{EdgeSample, GradientPolicy};
use crate::poisson::ordering::EliminationOrder;
use crate::Image;
use image::Rgb;
use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Number of color channels solved per composite.
pub const CHANNELS: usize = 3;

/// ソース座標からターゲット座標への平行移動量
///
/// ソース（マスク）座標 `(x, y)` はターゲット座標 `(x + dx, y + dy)` に対応します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Offset {
    pub dx: i64,
    pub dy: i64,
}

impl Offset {
    #[must_use]
    pub const fn new(dx: i64, dy: i64) -> Self {
        Self { dx, dy }
    }

    /// Maps a mask-local coordinate into a surface of `bounds`, `None` when it lands outside.
    #[must_use]
    pub fn map(self, x: u32, y: u32, bounds: (u32, u32)) -> Option<(u32, u32)> {
        let tx = i64::from(x) + self.dx;
        let ty = i64::from(y) + self.dy;
        let in_bounds =
            (0..i64::from(bounds.0)).contains(&tx) && (0..i64::from(bounds.1)).contains(&ty);
        in_bounds.then(|| (tx as u32, ty as u32))
    }
}

/// The channel-independent left-hand side of the system.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMatrix {
    matrix: CscMatrix<f64>,
    boundary_edges: usize,
    order: EliminationOrder,
}

impl SystemMatrix {
    #[must_use]
    pub fn matrix(&self) -> &CscMatrix<f64> {
        &self.matrix
    }

    #[must_use]
    pub fn unknowns(&self) -> usize {
        self.matrix.nrows()
    }

    #[must_use]
    pub fn nonzeros(&self) -> usize {
        self.matrix.nnz()
    }

    /// Edges from an active pixel to an in-bounds inactive neighbor.
    ///
    /// With zero such edges no row is strictly diagonally dominant and the
    /// Laplacian is singular.
    #[must_use]
    pub fn boundary_edges(&self) -> usize {
        self.boundary_edges
    }

    /// Permutation applied to the unknowns before factoring.
    #[must_use]
    pub fn elimination_order(&self) -> &EliminationOrder {
        &self.order
    }
}

/// Left-hand side plus the `N x 3` right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseSystem {
    pub matrix: SystemMatrix,
    pub rhs: DMatrix<f64>,
}

/// Builds the Poisson system for one region and one gradient policy.
#[derive(Debug, Clone, Copy)]
pub struct PoissonSystemBuilder<'a> {
    region: &'a ActiveRegion,
    policy: GradientPolicy,
}

impl<'a> PoissonSystemBuilder<'a> {
    #[must_use]
    pub fn new(region: &'a ActiveRegion, policy: GradientPolicy) -> Self {
        Self { region, policy }
    }

    /// Builds `A` and `B` in one go.
    ///
    /// The caller guarantees that `source` covers the mask dimensions.
    #[must_use]
    pub fn build(
        &self,
        source: &Image<Rgb<u8>>,
        target: &Image<Rgb<u8>>,
        offset: Offset,
    ) -> SparseSystem {
        SparseSystem {
            matrix: self.build_matrix(),
            rhs: self.build_rhs(source, target, offset),
        }
    }

    /// Assembles the Laplacian from `(row, col, value)` triplets.
    ///
    /// Duplicate positions are summed by the COO to CSC conversion.
    #[must_use]
    pub fn build_matrix(&self) -> SystemMatrix {
        let n = self.region.len();
        let mut triplets = CooMatrix::new(n, n);
        let mut boundary_edges = 0;

        for (i, (x, y)) in self.region.iter() {
            let mut degree = 0u32;
            for (nx, ny) in self.region.neighbors(x, y) {
                match self.region.index_of(nx, ny) {
                    Some(j) => triplets.push(i, j, -1.0),
                    None => boundary_edges += 1,
                }
                degree += 1;
            }
            triplets.push(i, i, f64::from(degree));

            if degree < 4 {
                tracing::trace!(x, y, degree, "pixel has fewer than four in-bounds neighbors");
            }
        }

        let matrix = CscMatrix::from(&triplets);
        tracing::info!(
            unknowns = n,
            nonzeros = matrix.nnz(),
            boundary_edges,
            "Poisson matrix assembled"
        );

        SystemMatrix {
            matrix,
            boundary_edges,
            order: EliminationOrder::nested_dissection(self.region),
        }
    }

    /// Assembles the right-hand side, one column per channel.
    #[must_use]
    pub fn build_rhs(
        &self,
        source: &Image<Rgb<u8>>,
        target: &Image<Rgb<u8>>,
        offset: Offset,
    ) -> DMatrix<f64> {
        let target_bounds = target.dimensions();
        let sample = |image: &Image<Rgb<u8>>, (x, y): (u32, u32)| -> [f64; CHANNELS] {
            image.get_pixel(x, y).0.map(f64::from)
        };

        tracing::debug!(
            source = ?source.dimensions(),
            mask = ?self.region.dimensions(),
            target = ?target_bounds,
            ?offset,
            policy = ?self.policy,
            "building right-hand side"
        );

        let mut rhs = DMatrix::zeros(self.region.len(), CHANNELS);
        for (i, (x, y)) in self.region.iter() {
            let src_p = sample(source, (x, y));
            let tar_p = offset.map(x, y, target_bounds).map(|p| sample(target, p));

            for (nx, ny) in self.region.neighbors(x, y) {
                let src_q = sample(source, (nx, ny));
                let tar_q = offset.map(nx, ny, target_bounds).map(|q| sample(target, q));

                // Dirichlet term for neighbors outside the active region. A
                // neighbor mapped off the target borrows the target color
                // under `p`, or the source color of `q` when `p` is off too.
                if self.region.index_of(nx, ny).is_none() {
                    let boundary = tar_q.or(tar_p).unwrap_or(src_q);
                    if tar_q.is_none() {
                        tracing::trace!(nx, ny, "boundary neighbor outside target");
                    }
                    for (c, value) in boundary.into_iter().enumerate() {
                        rhs[(i, c)] += value;
                    }
                }

                for c in 0..CHANNELS {
                    let edge = EdgeSample {
                        source: (src_p[c], src_q[c]),
                        target: tar_p.zip(tar_q).map(|(p, q)| (p[c], q[c])),
                    };
                    rhs[(i, c)] += self.policy.edge_gradient(edge);
                }
            }
        }
        rhs
    }
}
