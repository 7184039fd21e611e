use crate::error::{CloneResult, Error};
use crate::poisson::active_region::ActiveRegion;
use crate::poisson::factorization::FactorizationCache;
use crate::poisson::gradient::GradientPolicy;
use crate::poisson::solver::{scatter_channel, ChannelSolver, ChannelStats};
use crate::poisson::system::{Offset, PoissonSystemBuilder, SystemMatrix, CHANNELS};
use crate::utils::validate_mask_fits;
use crate::Image;
use image::{Pixel, Rgb};

/// 1回の合成処理の結果レポート
#[derive(Debug, Clone, PartialEq)]
pub struct CloneReport {
    /// 未知数（アクティブピクセル）の数
    pub unknowns: usize,
    /// 係数行列の非ゼロ要素数
    pub nonzeros: usize,
    /// 今回の処理で分解を再利用したかどうか
    pub reused_factorization: bool,
    /// チャンネルごとの統計
    pub channels: Vec<ChannelStats>,
}

/// A compositing session: one mask, one offset, one gradient policy.
///
/// The session owns the active-region numbering, the system matrix and its
/// factorization. The matrix depends only on the mask, so changing the
/// offset or the policy keeps the factorization while changing the mask to
/// a different topology drops it.
///
/// ```no_run
/// use image::{Luma, Rgb};
/// use poisson_clone::{CloneSession, GradientPolicy, Image, Offset};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source: Image<Rgb<u8>> = Image::new(32, 32);
/// let mask: Image<Luma<u8>> = Image::from_fn(32, 32, |x, y| {
///     Luma([if x.abs_diff(16) + y.abs_diff(16) < 12 { 255 } else { 0 }])
/// });
/// let mut target: Image<Rgb<u8>> = Image::new(128, 128);
///
/// let mut session = CloneSession::new(GradientPolicy::MixMax);
/// session.set_mask(&mask)?.set_offset(Offset::new(40, 40));
/// let report = session.apply(&source, &mut target)?;
/// println!("solved {} unknowns", report.unknowns);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CloneSession {
    policy: GradientPolicy,
    offset: Offset,
    region: Option<ActiveRegion>,
    matrix: Option<SystemMatrix>,
    cache: FactorizationCache,
}

impl CloneSession {
    #[must_use]
    pub fn new(policy: GradientPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Indexes `mask` and rebuilds the system matrix if the active region changed.
    ///
    /// # Errors
    ///
    /// * `Error::EmptyRegion` - the mask selects no pixel; the previous mask is kept
    pub fn set_mask<P>(&mut self, mask: &Image<P>) -> CloneResult<&mut Self>
    where
        P: Pixel<Subpixel = u8>,
    {
        let region = ActiveRegion::from_mask(mask)?;
        if self.region.as_ref() == Some(&region) {
            tracing::debug!("mask unchanged, keeping factorization");
            return Ok(self);
        }

        self.cache.invalidate();
        self.matrix = Some(PoissonSystemBuilder::new(&region, self.policy).build_matrix());
        self.region = Some(region);
        Ok(self)
    }

    /// Moves the pasted region. Only the right-hand side depends on the offset.
    pub fn set_offset(&mut self, offset: Offset) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Switches the gradient policy. Only the right-hand side depends on it.
    pub fn set_policy(&mut self, policy: GradientPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> GradientPolicy {
        self.policy
    }

    #[must_use]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    #[must_use]
    pub fn active_region(&self) -> Option<&ActiveRegion> {
        self.region.as_ref()
    }

    #[must_use]
    pub fn is_factorized(&self) -> bool {
        self.cache.is_ready()
    }

    /// Number of matrix decompositions performed by this session.
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.cache.rebuild_count()
    }

    /// Composites `source` into `target` in place.
    ///
    /// Channels are solved and written in order R, G, B; a failure aborts
    /// the remaining channels and leaves the already written ones in place.
    ///
    /// # Errors
    ///
    /// * `Error::MaskNotSet` - [`CloneSession::set_mask`] was never called
    /// * `Error::DimensionMismatch` - the mask is larger than `source`
    /// * `Error::DecompositionFailed` - the system matrix could not be factored
    /// * `Error::SolveFailed` - a channel solve produced no usable solution
    #[tracing::instrument(skip_all, fields(policy = ?self.policy, offset = ?self.offset))]
    pub fn apply(
        &mut self,
        source: &Image<Rgb<u8>>,
        target: &mut Image<Rgb<u8>>,
    ) -> CloneResult<CloneReport> {
        let (Some(region), Some(matrix)) = (self.region.as_ref(), self.matrix.as_ref()) else {
            return Err(Error::MaskNotSet);
        };
        validate_mask_fits(source.dimensions(), region.dimensions())?;

        let rhs = PoissonSystemBuilder::new(region, self.policy).build_rhs(
            source,
            target,
            self.offset,
        );

        let rebuilds_before = self.cache.rebuild_count();
        let factor = self.cache.ensure_ready(matrix)?;
        let solver = ChannelSolver::new(factor, &rhs);

        let channels = solve_and_scatter(&solver, region, target, self.offset)?;
        let reused_factorization = self.cache.rebuild_count() == rebuilds_before;

        tracing::info!(
            unknowns = matrix.unknowns(),
            reused_factorization,
            "composite finished"
        );

        Ok(CloneReport {
            unknowns: matrix.unknowns(),
            nonzeros: matrix.nonzeros(),
            reused_factorization,
            channels,
        })
    }
}

#[cfg(not(feature = "rayon"))]
fn solve_and_scatter(
    solver: &ChannelSolver<'_>,
    region: &ActiveRegion,
    target: &mut Image<Rgb<u8>>,
    offset: Offset,
) -> CloneResult<Vec<ChannelStats>> {
    (0..CHANNELS)
        .map(|channel| -> CloneResult<ChannelStats> {
            let solution = solver.solve(channel)?;
            Ok(scatter_channel(region, &solution, target, offset, channel))
        })
        .collect()
}

#[cfg(feature = "rayon")]
fn solve_and_scatter(
    solver: &ChannelSolver<'_>,
    region: &ActiveRegion,
    target: &mut Image<Rgb<u8>>,
    offset: Offset,
) -> CloneResult<Vec<ChannelStats>> {
    use rayon::prelude::*;

    let solutions = (0..CHANNELS)
        .into_par_iter()
        .map(|channel| solver.solve(channel))
        .collect::<CloneResult<Vec<_>>>()?;

    Ok(solutions
        .iter()
        .enumerate()
        .map(|(channel, solution)| scatter_channel(region, solution, target, offset, channel))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{gradient_rgb_image, mask_from_rows, solid_rgb_image};

    fn interior_mask() -> Image<image::Luma<u8>> {
        mask_from_rows(&["......", ".###..", ".####.", "..##..", "......"])
    }

    #[test]
    fn apply_without_mask_fails() {
        let source = solid_rgb_image(4, 4, Rgb([1, 2, 3]));
        let mut target = solid_rgb_image(4, 4, Rgb([0, 0, 0]));
        let mut session = CloneSession::new(GradientPolicy::Import);

        assert_eq!(
            session.apply(&source, &mut target),
            Err(Error::MaskNotSet)
        );
    }

    #[test]
    fn apply_rejects_mask_larger_than_source() {
        let source = solid_rgb_image(4, 4, Rgb([1, 2, 3]));
        let mut target = solid_rgb_image(8, 8, Rgb([0, 0, 0]));
        let mut session = CloneSession::new(GradientPolicy::Import);
        session.set_mask(&interior_mask()).unwrap();

        assert_eq!(
            session.apply(&source, &mut target),
            Err(Error::DimensionMismatch {
                expected: (4, 4),
                actual: (6, 5)
            })
        );
    }

    #[test]
    fn repeated_apply_reuses_factorization() {
        let source = gradient_rgb_image(6, 5);
        let mut target = solid_rgb_image(10, 10, Rgb([40, 80, 120]));
        let mut session = CloneSession::new(GradientPolicy::Import);
        session
            .set_mask(&interior_mask())
            .unwrap()
            .set_offset(Offset::new(2, 3));

        let first = session.apply(&source, &mut target).unwrap();
        let after_first = target.clone();
        let second = session.apply(&source, &mut target).unwrap();

        assert!(!first.reused_factorization);
        assert!(second.reused_factorization);
        assert_eq!(session.rebuild_count(), 1);
        assert_eq!(target, after_first);
        assert_eq!(first.unknowns, 9);
        assert_eq!(first.channels.len(), CHANNELS);
    }

    #[test]
    fn offset_and_policy_changes_keep_factorization() {
        let source = gradient_rgb_image(6, 5);
        let mut target = solid_rgb_image(12, 12, Rgb([10, 10, 10]));
        let mut session = CloneSession::new(GradientPolicy::Import);
        session.set_mask(&interior_mask()).unwrap();

        session.apply(&source, &mut target).unwrap();
        session.set_offset(Offset::new(4, 4));
        session.apply(&source, &mut target).unwrap();
        session.set_policy(GradientPolicy::MixMax);
        session.apply(&source, &mut target).unwrap();

        assert_eq!(session.rebuild_count(), 1);
        assert_eq!(session.policy(), GradientPolicy::MixMax);
        assert_eq!(session.offset(), Offset::new(4, 4));
    }

    #[test]
    fn changing_mask_forces_rebuild() {
        let source = gradient_rgb_image(6, 5);
        let mut target = solid_rgb_image(8, 8, Rgb([10, 10, 10]));
        let mut session = CloneSession::new(GradientPolicy::Import);

        session.set_mask(&interior_mask()).unwrap();
        session.apply(&source, &mut target).unwrap();
        assert!(session.is_factorized());

        let other = mask_from_rows(&["......", "..##..", "..##..", "......", "......"]);
        session.set_mask(&other).unwrap();
        assert!(!session.is_factorized());
        session.apply(&source, &mut target).unwrap();

        assert_eq!(session.rebuild_count(), 2);
        assert_eq!(session.active_region().map(ActiveRegion::len), Some(4));
    }

    #[test]
    fn setting_identical_mask_keeps_factorization() {
        let source = gradient_rgb_image(6, 5);
        let mut target = solid_rgb_image(8, 8, Rgb([10, 10, 10]));
        let mut session = CloneSession::new(GradientPolicy::Import);

        session.set_mask(&interior_mask()).unwrap();
        session.apply(&source, &mut target).unwrap();
        session.set_mask(&interior_mask()).unwrap();

        assert!(session.is_factorized());
        session.apply(&source, &mut target).unwrap();
        assert_eq!(session.rebuild_count(), 1);
    }

    #[test]
    fn empty_mask_keeps_previous_region() {
        let mut session = CloneSession::new(GradientPolicy::Import);
        session.set_mask(&interior_mask()).unwrap();

        let empty: Image<image::Luma<u8>> = Image::new(6, 5);
        assert!(matches!(session.set_mask(&empty), Err(Error::EmptyRegion)));
        assert_eq!(session.active_region().map(ActiveRegion::len), Some(9));
    }

    #[test]
    fn decomposition_failure_leaves_target_untouched() {
        let source = gradient_rgb_image(2, 2);
        let mut target = solid_rgb_image(4, 4, Rgb([9, 9, 9]));
        let original = target.clone();
        let mut session = CloneSession::new(GradientPolicy::Import);
        session
            .set_mask(&mask_from_rows(&["##", "##"]))
            .unwrap()
            .set_offset(Offset::new(1, 1));

        assert!(matches!(
            session.apply(&source, &mut target),
            Err(Error::DecompositionFailed { .. })
        ));
        assert_eq!(target, original);
        assert!(!session.is_factorized());
    }
}
