use crate::error::{CloneResult, Error};
use crate::poisson::ordering::EliminationOrder;
use crate::poisson::system::SystemMatrix;
use nalgebra::DMatrix;
use nalgebra_sparse::factorization::{CholeskyError, CscCholesky};
use nalgebra_sparse::CscMatrix;
use std::fmt;

/// 係数行列のコレスキー分解キャッシュ
///
/// 係数行列はマスクのトポロジーだけに依存するため、一度分解すれば
/// 3チャンネルの求解と、マスクが変わらない限りの再計算で使い回せます。
#[derive(Default)]
pub struct FactorizationCache {
    entry: Option<CachedFactor>,
    rebuilds: usize,
}

struct CachedFactor {
    system: SystemMatrix,
    factorization: Factorization,
}

/// Cholesky factor of `P A P^T` together with the permutation `P`.
pub struct Factorization {
    order: EliminationOrder,
    factor: CscCholesky<f64>,
}

impl Factorization {
    /// Factors `matrix` after reordering its unknowns by `order`.
    pub(crate) fn new(
        matrix: &CscMatrix<f64>,
        order: EliminationOrder,
    ) -> Result<Self, CholeskyError> {
        let factor = CscCholesky::factor(&order.permute_matrix(matrix))?;
        Ok(Self { order, factor })
    }

    #[must_use]
    pub fn unknowns(&self) -> usize {
        self.order.len()
    }

    /// Nonzeros of the lower-triangular factor, fill included.
    #[must_use]
    pub fn factor_nonzeros(&self) -> usize {
        self.factor.l().nnz()
    }

    /// Solves `A x = rhs[:, column]` and returns `x` in unknown order.
    #[must_use]
    pub fn solve_column(&self, rhs: &DMatrix<f64>, column: usize) -> Vec<f64> {
        let permuted = self.factor.solve(&self.order.gather(rhs, column));
        self.order.scatter(&permuted)
    }
}

impl fmt::Debug for Factorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factorization")
            .field("unknowns", &self.unknowns())
            .field("factor_nonzeros", &self.factor_nonzeros())
            .finish()
    }
}

impl fmt::Debug for FactorizationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorizationCache")
            .field("ready", &self.is_ready())
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

impl FactorizationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a factorization of `system`, decomposing only when the cached
    /// one was built for a different matrix.
    ///
    /// # Errors
    ///
    /// * `Error::DecompositionFailed` - the matrix is singular or not positive
    ///   definite; the cache is left empty
    pub fn ensure_ready(&mut self, system: &SystemMatrix) -> CloneResult<&Factorization> {
        let cached = match self.entry.take() {
            Some(cached) if cached.system == *system => {
                tracing::debug!("reusing cached factorization");
                cached
            }
            _ => {
                let factorization = decompose(system)?;
                self.rebuilds += 1;
                tracing::info!(
                    unknowns = system.unknowns(),
                    nonzeros = system.nonzeros(),
                    factor_nonzeros = factorization.factor_nonzeros(),
                    rebuilds = self.rebuilds,
                    "matrix decomposed"
                );
                CachedFactor {
                    system: system.clone(),
                    factorization,
                }
            }
        };

        Ok(&self.entry.insert(cached).factorization)
    }

    /// Drops the cached factorization.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            tracing::debug!("factorization invalidated");
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.entry.is_some()
    }

    /// How many decompositions this cache has performed.
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }
}

fn decompose(system: &SystemMatrix) -> CloneResult<Factorization> {
    let unknowns = system.unknowns();
    tracing::debug!(unknowns, "starting sparse Cholesky decomposition");

    if unknowns == 0 {
        return Err(Error::EmptyRegion);
    }

    // A Laplacian with no Dirichlet row is only semi-definite
    if system.boundary_edges() == 0 {
        tracing::error!(unknowns, "active region has no boundary; matrix is singular");
        return Err(Error::DecompositionFailed {
            unknowns,
            reason: "active region has no boundary neighbor, matrix is singular".to_string(),
        });
    }

    Factorization::new(system.matrix(), system.elimination_order().clone()).map_err(|err| {
        tracing::error!(unknowns, ?err, "matrix decomposition failed");
        Error::DecompositionFailed {
            unknowns,
            reason: format!("{err:?}"),
        }
    })
}
