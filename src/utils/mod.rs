//! Internal utility functions for poisson-clone.
//!
//! This module contains common functionality shared by the cloning phases.

use crate::error::{CloneResult, Error};
use imageproc::definitions::Clamp;

/// Rounds a solved intensity to the nearest integer and clamps it to `[0, 255]`.
///
/// Values are rounded, not truncated: `199.9999` becomes `200`, not `199`.
///
/// # Arguments
///
/// * `value` - The solved (unclamped) intensity
///
/// # Returns
///
/// The intensity as an 8-bit subpixel
#[inline]
pub fn clamp_f64_to_u8(value: f64) -> u8 {
    <u8 as Clamp<f32>>::clamp(value.round() as f32)
}

/// Validates that a mask fits inside the source image.
///
/// Every active pixel reads its source color at the same mask-local
/// coordinate, so the source must be at least as large as the mask.
///
/// # Arguments
///
/// * `source` - Source dimensions (width, height)
/// * `mask` - Mask dimensions (width, height)
///
/// # Returns
///
/// `Ok(())` if the mask fits, otherwise `Error::DimensionMismatch`
pub fn validate_mask_fits(source: (u32, u32), mask: (u32, u32)) -> CloneResult<()> {
    if mask.0 > source.0 || mask.1 > source.1 {
        Err(Error::DimensionMismatch {
            expected: source,
            actual: mask,
        })
    } else {
        Ok(())
    }
}
