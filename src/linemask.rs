//! Rotated line-detector kernels.
//!
//! A [`LineMask`] is a square averaging kernel of odd side `k` whose nonzero
//! support is a gapless rasterized line of length `k` through the center at
//! a fixed angle. The [`LineMaskBank`] samples `r` orientations uniformly
//! over [0°, 180°); orientation is π-periodic, so θ and θ + 180° produce
//! the same support and only one copy is stored.

use crate::error::{Error, Result};

/// Averaging kernel for one orientation. Stores only the marked cells as
/// offsets from the kernel center; the response at a pixel is the mean
/// intensity over those cells.
#[derive(Clone, Debug, PartialEq)]
pub struct LineMask {
    /// Kernel side length (odd)
    pub size: usize,
    /// Orientation in degrees, in [0, 180)
    pub angle_deg: f32,
    offsets: Vec<(i32, i32)>,
}

impl LineMask {
    /// Rasterize the line of length `size` through the kernel center at
    /// `angle_deg`, stepping along the dominant axis so the line has no
    /// gaps. `size` must be odd and ≥ 3.
    ///
    /// The angle is canonicalized into [0°, 180°) first, so angles that
    /// differ by 180° produce identical masks, offset order included.
    pub fn rasterize(size: usize, angle_deg: f32) -> Self {
        debug_assert!(size >= 3 && size % 2 == 1);
        let radius = (size / 2) as i32;
        let angle_deg = angle_deg.rem_euclid(180.0);
        let theta = angle_deg.to_radians();
        let (sin, cos) = theta.sin_cos();

        let mut offsets = Vec::with_capacity(size);
        if cos.abs() >= sin.abs() {
            // Mostly horizontal: one cell per column.
            let slope = sin / cos;
            for dx in -radius..=radius {
                let dy = (dx as f32 * slope).round() as i32;
                offsets.push((dx, dy));
            }
        } else {
            // Mostly vertical: one cell per row.
            let slope = cos / sin;
            for dy in -radius..=radius {
                let dx = (dy as f32 * slope).round() as i32;
                offsets.push((dx, dy));
            }
        }

        Self {
            size,
            angle_deg,
            offsets,
        }
    }

    /// Marked cells as (dx, dy) offsets from the kernel center.
    #[inline]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Number of marked cells (the averaging divisor).
    #[inline]
    pub fn support(&self) -> usize {
        self.offsets.len()
    }

    /// Per-cell weight of the averaging filter; weights sum to 1.
    #[inline]
    pub fn weight(&self) -> f32 {
        1.0 / self.offsets.len() as f32
    }
}

/// Ordered, immutable set of line masks, one per sampled orientation.
/// Deterministic given `(kernel_size, rotation_resolution)`; built once per
/// run and shared across images.
#[derive(Clone, Debug)]
pub struct LineMaskBank {
    /// Kernel side length shared by every mask
    pub kernel_size: usize,
    masks: Vec<LineMask>,
}

impl LineMaskBank {
    /// Generate `rotation_resolution` masks at angles `i * 180 / r` degrees.
    ///
    /// Fails with [`Error::InvalidParameter`] unless `kernel_size` is an odd
    /// integer ≥ 3 and `rotation_resolution` ≥ 1.
    pub fn generate(kernel_size: usize, rotation_resolution: usize) -> Result<Self> {
        if kernel_size < 3 || kernel_size % 2 == 0 {
            return Err(Error::InvalidParameter(format!(
                "kernel size must be an odd integer >= 3, got {kernel_size}"
            )));
        }
        if rotation_resolution == 0 {
            return Err(Error::InvalidParameter(
                "rotation resolution must be >= 1".to_string(),
            ));
        }

        let step = 180.0 / rotation_resolution as f32;
        let masks = (0..rotation_resolution)
            .map(|i| LineMask::rasterize(kernel_size, i as f32 * step))
            .collect();
        Ok(Self { kernel_size, masks })
    }

    /// Masks in angle order.
    #[inline]
    pub fn masks(&self) -> &[LineMask] {
        &self.masks
    }

    /// Number of sampled orientations.
    #[inline]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Kernel radius: no mask cell lies further than this from the center.
    #[inline]
    pub fn radius(&self) -> usize {
        self.kernel_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_yields_one_mask_per_angle() {
        let bank = LineMaskBank::generate(15, 15).expect("valid parameters");
        assert_eq!(bank.len(), 15);
        for (i, mask) in bank.masks().iter().enumerate() {
            assert_eq!(mask.size, 15);
            assert!((mask.angle_deg - i as f32 * 12.0).abs() < 1e-5);
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let bank = LineMaskBank::generate(9, 12).expect("valid parameters");
        for mask in bank.masks() {
            let total = mask.weight() * mask.support() as f32;
            assert!((total - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn support_stays_within_kernel() {
        let bank = LineMaskBank::generate(15, 36).expect("valid parameters");
        let radius = bank.radius() as i32;
        for mask in bank.masks() {
            assert_eq!(mask.support(), 15, "one cell per dominant-axis step");
            for &(dx, dy) in mask.offsets() {
                assert!(dx.abs() <= radius && dy.abs() <= radius);
            }
        }
    }

    #[test]
    fn line_is_gapless_along_dominant_axis() {
        for angle in [0.0f32, 30.0, 60.0, 90.0, 120.0, 150.0] {
            let mask = LineMask::rasterize(11, angle);
            let mut majors: Vec<i32> = mask
                .offsets()
                .iter()
                .map(|&(dx, dy)| {
                    if angle.to_radians().cos().abs() >= angle.to_radians().sin().abs() {
                        dx
                    } else {
                        dy
                    }
                })
                .collect();
            majors.sort_unstable();
            for pair in majors.windows(2) {
                assert_eq!(pair[1] - pair[0], 1, "gap at angle {angle}");
            }
        }
    }

    #[test]
    fn orientation_is_modulo_180() {
        // The diagonals are the delicate case: without canonicalization,
        // f32 rounding of sin/cos can flip the dominant-axis branch between
        // θ and θ + 180° and reverse the offset order.
        for angle in [0.0f32, 12.0, 45.0, 90.0, 135.0, 168.0] {
            let a = LineMask::rasterize(15, angle);
            let b = LineMask::rasterize(15, angle + 180.0);
            assert_eq!(a, b, "angle {angle}");
            assert_eq!(b.angle_deg, angle, "stored angle is canonical");
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            LineMaskBank::generate(1, 15),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LineMaskBank::generate(14, 15),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            LineMaskBank::generate(15, 0),
            Err(Error::InvalidParameter(_))
        ));
    }
}
