//! Test utilities for poisson-clone
//!
//! This module provides common fixtures for testing the cloning phases.
//! It is only compiled when running tests.

use crate::Image;
use image::{Luma, Pixel, Primitive, Rgb};

/// Builds a mask from ASCII rows: `#` is active (255), anything else inactive (0).
///
/// # Arguments
/// * `rows` - One string per mask row, all of the same length
///
/// # Returns
/// A Luma mask whose width is the row length and height the row count
pub fn mask_from_rows(rows: &[&str]) -> Image<Luma<u8>> {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |row| row.len()) as u32;
    let mut mask: Image<Luma<u8>> = Image::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, cell) in row.bytes().enumerate() {
            let value = if cell == b'#' { 255 } else { 0 };
            mask.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    mask
}

/// Creates an RGB image filled with a single color.
pub fn solid_rgb_image(width: u32, height: u32, color: Rgb<u8>) -> Image<Rgb<u8>> {
    Image::from_pixel(width, height, color)
}

/// Creates an RGB image whose channels vary independently with position.
///
/// Neighboring pixels always differ, so every edge carries a gradient.
pub fn gradient_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, y| {
        Rgb([
            ((20 + 30 * x + 7 * y) % 256) as u8,
            ((200 + 11 * y) as i64 - 9 * i64::from(x)).rem_euclid(256) as u8,
            ((60 + 13 * x + 17 * y) % 256) as u8,
        ])
    })
}

/// Compares two pixel values with a tolerance for floating-point precision errors.
///
/// # Arguments
/// * `expected` - The expected pixel value
/// * `actual` - The actual pixel value
/// * `tolerance` - The maximum allowed difference between values
///
/// # Returns
/// `true` if all subpixel values are within the tolerance, `false` otherwise
pub fn pixels_approx_equal<P>(expected: P, actual: P, tolerance: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected
        .channels()
        .iter()
        .zip(actual.channels())
        .all(|(e, a)| (f32::from(*e) - f32::from(*a)).abs() <= tolerance)
}

/// Compares two images pixel by pixel with a tolerance for floating-point errors.
pub fn images_approx_equal<P>(expected: &Image<P>, actual: &Image<P>, tolerance: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected.dimensions() == actual.dimensions()
        && expected
            .pixels()
            .zip(actual.pixels())
            .all(|(e, a)| pixels_approx_equal(*e, *a, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_from_rows_marks_hash_cells_active() {
        let mask = mask_from_rows(&["#.", ".#", ".."]);
        assert_eq!(mask.dimensions(), (2, 3));
        assert_eq!(mask.get_pixel(0, 0), &Luma([255]));
        assert_eq!(mask.get_pixel(1, 0), &Luma([0]));
        assert_eq!(mask.get_pixel(1, 1), &Luma([255]));
    }

    #[test]
    fn gradient_rgb_image_neighbors_differ() {
        let image = gradient_rgb_image(6, 6);
        for y in 0..6 {
            for x in 0..5 {
                assert_ne!(image.get_pixel(x, y), image.get_pixel(x + 1, y));
                assert_ne!(image.get_pixel(y, x), image.get_pixel(y, x + 1));
            }
        }
    }

    #[test]
    fn images_approx_equal_with_tolerant_comparison_returns_true() {
        let image1 = solid_rgb_image(2, 2, Rgb([100, 150, 200]));
        let mut image2 = image1.clone();
        image2.put_pixel(0, 0, Rgb([101, 150, 200]));

        assert!(images_approx_equal(&image1, &image2, 1.5));
        assert!(!images_approx_equal(&image1, &image2, 0.5));
        assert!(!images_approx_equal(&image1, &solid_rgb_image(3, 2, Rgb([0, 0, 0])), 255.0));
    }
}
