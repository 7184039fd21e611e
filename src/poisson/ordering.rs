//! Fill-reducing elimination order for the sparse Cholesky factorization.
//!
//! Factoring the Laplacian in row-major unknown order fills the whole band
//! between neighboring rows, which grows as `N * W` for a region `W` pixels
//! wide. Geometric nested dissection splits the region at a median row or
//! column, orders both halves recursively and eliminates the separating line
//! last. The public row-major numbering of [`ActiveRegion`] is untouched; the
//! permutation is applied only around the factorization.

use crate::poisson::active_region::ActiveRegion;
use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Pieces at or below this size are eliminated in row-major order.
const LEAF_SIZE: usize = 64;

type Cell = (usize, (u32, u32));

/// Symmetric permutation of the unknowns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationOrder {
    /// elimination step -> unknown index
    order: Vec<usize>,
    /// unknown index -> elimination step
    step: Vec<usize>,
}

impl EliminationOrder {
    /// Keeps the row-major numbering.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self {
            order: (0..n).collect(),
            step: (0..n).collect(),
        }
    }

    /// Geometric nested dissection over the pixel coordinates of `region`.
    #[must_use]
    pub fn nested_dissection(region: &ActiveRegion) -> Self {
        let mut order = Vec::with_capacity(region.len());
        dissect(region.iter().collect(), &mut order);

        let mut step = vec![0; order.len()];
        for (k, &i) in order.iter().enumerate() {
            step[i] = k;
        }

        tracing::trace!(unknowns = order.len(), "nested dissection order computed");
        Self { order, step }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Unknown eliminated at step `k`.
    #[must_use]
    pub fn unknown_at(&self, k: usize) -> Option<usize> {
        self.order.get(k).copied()
    }

    /// `P A P^T`: entry `(i, j)` moves to `(step[i], step[j])`.
    #[must_use]
    pub fn permute_matrix(&self, matrix: &CscMatrix<f64>) -> CscMatrix<f64> {
        let n = matrix.nrows();
        let mut triplets = CooMatrix::new(n, n);
        for (i, j, &v) in matrix.triplet_iter() {
            triplets.push(self.step[i], self.step[j], v);
        }
        CscMatrix::from(&triplets)
    }

    /// Reads column `column` of `rhs` in elimination order.
    #[must_use]
    pub fn gather(&self, rhs: &DMatrix<f64>, column: usize) -> DMatrix<f64> {
        DMatrix::from_fn(self.order.len(), 1, |k, _| rhs[(self.order[k], column)])
    }

    /// Puts a solution in elimination order back into unknown order.
    #[must_use]
    pub fn scatter(&self, permuted: &DMatrix<f64>) -> Vec<f64> {
        let mut solution = vec![0.0; self.order.len()];
        for (k, &i) in self.order.iter().enumerate() {
            solution[i] = permuted[(k, 0)];
        }
        solution
    }
}

fn dissect(cells: Vec<Cell>, order: &mut Vec<usize>) {
    if cells.len() <= LEAF_SIZE {
        order.extend(cells.iter().map(|&(i, _)| i));
        return;
    }

    let (min_x, max_x, min_y, max_y) = cells.iter().fold(
        (u32::MAX, 0, u32::MAX, 0),
        |(min_x, max_x, min_y, max_y), &(_, (x, y))| {
            (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
        },
    );
    // Cut across the longer side so the separator stays short
    let across_x = max_x - min_x >= max_y - min_y;
    let coordinate = |&(_, (x, y)): &Cell| if across_x { x } else { y };

    let mut coordinates: Vec<u32> = cells.iter().map(coordinate).collect();
    let middle = coordinates.len() / 2;
    let (_, &mut split, _) = coordinates.select_nth_unstable(middle);

    // 4-neighbors differ by one in a single coordinate, so the line at
    // `split` disconnects `low` from `high`
    let (low, rest): (Vec<Cell>, Vec<Cell>) =
        cells.into_iter().partition(|cell| coordinate(cell) < split);
    let (separator, high): (Vec<Cell>, Vec<Cell>) =
        rest.into_iter().partition(|cell| coordinate(cell) == split);

    dissect(low, order);
    dissect(high, order);
    order.extend(separator.iter().map(|&(i, _)| i));
}
