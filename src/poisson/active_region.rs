use crate::error::{CloneResult, Error};
use crate::Image;
use image::Pixel;
use itertools::iproduct;

/// マスクの第1チャンネルがこの値を超えるピクセルをアクティブとみなす
pub const MASK_THRESHOLD: u8 = 128;

/// Dense numbering of the pixels selected by a mask.
///
/// Unknown `i` of the linear system is the `i`-th active pixel in row-major
/// scan order. The numbering is rebuilt from scratch whenever the mask
/// changes and never mutated afterwards; two regions compare equal exactly
/// when they describe the same active-region topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRegion {
    width: u32,
    height: u32,
    /// `y * width + x` -> unknown index
    lookup: Vec<Option<usize>>,
    /// unknown index -> mask-local coordinate
    positions: Vec<(u32, u32)>,
}

impl ActiveRegion {
    /// Scans `mask` in row-major order and numbers every active pixel.
    ///
    /// # Errors
    ///
    /// * `Error::EmptyRegion` - no pixel exceeds [`MASK_THRESHOLD`]
    pub fn from_mask<P>(mask: &Image<P>) -> CloneResult<Self>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (width, height) = mask.dimensions();
        let mut lookup = vec![None; (width as usize) * (height as usize)];
        let mut positions = Vec::new();

        for (y, x) in iproduct!(0..height, 0..width) {
            if mask.get_pixel(x, y).channels()[0] > MASK_THRESHOLD {
                lookup[cell(width, x, y)] = Some(positions.len());
                positions.push((x, y));
            }
        }

        if positions.is_empty() {
            return Err(Error::EmptyRegion);
        }

        tracing::debug!(
            width,
            height,
            active = positions.len(),
            "indexed active region"
        );

        Ok(Self {
            width,
            height,
            lookup,
            positions,
        })
    }

    /// Number of active pixels (unknowns).
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always `false`; construction rejects empty masks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Mask dimensions (width, height).
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Unknown index of the pixel at `(x, y)`, `None` when inactive or outside the mask.
    #[must_use]
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.lookup[cell(self.width, x, y)]
    }

    /// Mask-local coordinate of unknown `index`.
    #[must_use]
    pub fn position(&self, index: usize) -> Option<(u32, u32)> {
        self.positions.get(index).copied()
    }

    /// Iterates `(index, (x, y))` in unknown order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, (u32, u32))> + '_ {
        self.positions.iter().copied().enumerate()
    }

    /// In-bounds 4-neighbors of `(x, y)`: left, right, up, down.
    pub(crate) fn neighbors(&self, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> {
        let (width, height) = (self.width, self.height);
        [
            x.checked_sub(1).map(|nx| (nx, y)),
            (x + 1 < width).then_some((x + 1, y)),
            y.checked_sub(1).map(|ny| (x, ny)),
            (y + 1 < height).then_some((x, y + 1)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Row-major offset of `(x, y)`, computed in `usize` so large masks do not wrap.
#[inline]
fn cell(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}
