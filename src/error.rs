use thiserror::Error;

/// Error type for gradient-domain cloning operations
///
/// Every variant is fatal for the compositing attempt that produced it.
/// Nothing is retried or silently recovered inside the crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The mask selects no pixel
    ///
    /// A mask whose first channel never exceeds the activity threshold
    /// yields an empty linear system, so no solve is attempted.
    #[error("Mask contains no active pixels")]
    EmptyRegion,

    /// The sparse Cholesky factorization of the system matrix failed
    ///
    /// This happens when the matrix is not positive definite, typically
    /// because an active region has no boundary anchoring it to the target
    /// or because a pixel has no in-bounds neighbor at all.
    #[error("Matrix decomposition failed for {unknowns} unknowns: {reason}")]
    DecompositionFailed {
        /// Number of unknowns (active pixels) in the system
        unknowns: usize,
        /// Description reported by the factorization
        reason: String,
    },

    /// A per-channel solve produced no usable solution
    ///
    /// Reported after a valid factorization when the back-substitution
    /// yields non-finite values.
    #[error("Linear solve failed for channel {channel}: {reason}")]
    SolveFailed {
        /// Color channel index (0 = R, 1 = G, 2 = B)
        channel: usize,
        /// Description of the failure
        reason: String,
    },

    /// Mask and source dimensions are incompatible
    ///
    /// The mask must fit inside the source image, since every active pixel
    /// reads its source color at the same mask-local coordinate.
    #[error("Mask does not fit the source image: source {expected:?}, mask {actual:?}")]
    DimensionMismatch {
        /// Source dimensions (width, height)
        expected: (u32, u32),
        /// Mask dimensions (width, height)
        actual: (u32, u32),
    },

    /// A session was applied before any mask was supplied
    #[error("No mask has been set on the clone session")]
    MaskNotSet,
}

/// Result type for cloning operations
pub type CloneResult<T> = Result<T, Error>;
