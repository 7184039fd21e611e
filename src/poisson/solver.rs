use crate::error::{CloneResult, Error};
use crate::poisson::active_region::ActiveRegion;
use crate::poisson::factorization::Factorization;
use crate::poisson::system::Offset;
use crate::utils::clamp_f64_to_u8;
use crate::Image;
use image::Rgb;
use nalgebra::DMatrix;

/// 1チャンネル分の求解結果の統計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    /// チャンネル番号 (0 = R, 1 = G, 2 = B)
    pub channel: usize,
    /// ターゲットに書き込まれたピクセル数
    pub written: usize,
    /// ターゲット範囲外のためスキップされたピクセル数
    pub out_of_bounds: usize,
    /// 解の最小値（クランプ前）
    pub min: f64,
    /// 解の最大値（クランプ前）
    pub max: f64,
}

/// Back-substitution against a shared factorization, one channel at a time.
#[derive(Clone, Copy)]
pub struct ChannelSolver<'a> {
    factor: &'a Factorization,
    rhs: &'a DMatrix<f64>,
}

impl<'a> ChannelSolver<'a> {
    #[must_use]
    pub fn new(factor: &'a Factorization, rhs: &'a DMatrix<f64>) -> Self {
        Self { factor, rhs }
    }

    /// Solves `A x = B[:, channel]`.
    ///
    /// # Errors
    ///
    /// * `Error::SolveFailed` - the column is missing or the solution is not finite
    pub fn solve(&self, channel: usize) -> CloneResult<Vec<f64>> {
        if channel >= self.rhs.ncols() {
            return Err(Error::SolveFailed {
                channel,
                reason: format!("right-hand side has {} columns", self.rhs.ncols()),
            });
        }

        tracing::debug!(channel, unknowns = self.rhs.nrows(), "solving channel");
        let solution = self.factor.solve_column(self.rhs, channel);

        if let Some(index) = solution.iter().position(|v| !v.is_finite()) {
            tracing::error!(channel, index, "non-finite value in solution");
            return Err(Error::SolveFailed {
                channel,
                reason: format!("non-finite value at unknown {index}"),
            });
        }

        Ok(solution)
    }
}

/// Writes one solved channel into `target`, skipping pixels mapped outside it.
pub fn scatter_channel(
    region: &ActiveRegion,
    solution: &[f64],
    target: &mut Image<Rgb<u8>>,
    offset: Offset,
    channel: usize,
) -> ChannelStats {
    let bounds = target.dimensions();
    let mut stats = ChannelStats {
        channel,
        written: 0,
        out_of_bounds: 0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    for ((x, y), &value) in region.iter().map(|(_, p)| p).zip(solution) {
        stats.min = stats.min.min(value);
        stats.max = stats.max.max(value);

        match offset.map(x, y, bounds) {
            Some((tx, ty)) => {
                target.get_pixel_mut(tx, ty)[channel] = clamp_f64_to_u8(value);
                stats.written += 1;
            }
            None => stats.out_of_bounds += 1,
        }
    }

    tracing::debug!(
        channel,
        written = stats.written,
        out_of_bounds = stats.out_of_bounds,
        min = stats.min,
        max = stats.max,
        "channel solution stats"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mask_from_rows, solid_rgb_image};

    use crate::poisson::ordering::EliminationOrder;

    fn diagonal_factor(values: &[f64]) -> Factorization {
        let n = values.len();
        let mut coo = nalgebra_sparse::CooMatrix::new(n, n);
        for (i, &v) in values.iter().enumerate() {
            coo.push(i, i, v);
        }
        Factorization::new(
            &nalgebra_sparse::CscMatrix::from(&coo),
            EliminationOrder::identity(n),
        )
        .unwrap()
    }

    #[test]
    fn solve_returns_column_solution() {
        let factor = diagonal_factor(&[4.0, 16.0]);
        let rhs = DMatrix::from_row_slice(2, 3, &[4.0, 8.0, 12.0, 16.0, 32.0, 48.0]);
        let solver = ChannelSolver::new(&factor, &rhs);

        assert_eq!(solver.solve(0).unwrap(), vec![1.0, 1.0]);
        assert_eq!(solver.solve(2).unwrap(), vec![3.0, 3.0]);
    }

    #[test]
    fn solve_rejects_missing_channel() {
        let factor = diagonal_factor(&[1.0]);
        let rhs = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);
        let solver = ChannelSolver::new(&factor, &rhs);

        assert!(matches!(
            solver.solve(3),
            Err(Error::SolveFailed { channel: 3, .. })
        ));
    }

    #[test]
    fn solve_rejects_non_finite_solution() {
        let factor = diagonal_factor(&[1.0]);
        let rhs = DMatrix::from_row_slice(1, 3, &[f64::NAN, 0.0, 0.0]);
        let solver = ChannelSolver::new(&factor, &rhs);

        assert!(matches!(
            solver.solve(0),
            Err(Error::SolveFailed { channel: 0, .. })
        ));
        assert!(solver.solve(1).is_ok());
    }

    #[test]
    fn scatter_clamps_and_skips_out_of_bounds() {
        let region = ActiveRegion::from_mask(&mask_from_rows(&["###"])).unwrap();
        let mut target = solid_rgb_image(3, 1, Rgb([7, 7, 7]));

        let stats = scatter_channel(
            &region,
            &[-20.0, 300.0, 99.6],
            &mut target,
            Offset::new(1, 0),
            1,
        );

        assert_eq!(target.get_pixel(0, 0), &Rgb([7, 7, 7]));
        assert_eq!(target.get_pixel(1, 0), &Rgb([7, 0, 7]));
        assert_eq!(target.get_pixel(2, 0), &Rgb([7, 255, 7]));
        assert_eq!(stats.written, 2);
        assert_eq!(stats.out_of_bounds, 1);
        assert_eq!(stats.min, -20.0);
        assert_eq!(stats.max, 300.0);
    }
}
