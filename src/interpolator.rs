use ndarray::{Array2, ArrayView2};

use crate::enums::Interpolation;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Dimensions (depth, height, width) at which every voxel is a cube of
    /// the finest spacing. `spacing` is (x, y, z).
    pub(crate) fn isotropic_dimensions(
        spacing: (f64, f64, f64),
        original_dim: (usize, usize, usize),
    ) -> (usize, usize, usize) {
        let (x_spacing, y_spacing, z_spacing) = spacing;
        let min_spacing = x_spacing.min(y_spacing).min(z_spacing);
        if min_spacing <= 0. || !min_spacing.is_finite() {
            return original_dim;
        }

        // original_dim is (depth, height, width) corresponding to (z, y, x)
        let scale = |n: usize, s: f64| ((n as f64 * s / min_spacing) as usize).max(1);
        (
            scale(original_dim.0, z_spacing),
            scale(original_dim.1, y_spacing),
            scale(original_dim.2, x_spacing),
        )
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f64>, y: f64, x: f64) -> f64 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f64;
        let dx = x - x0 as f64;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }

    #[inline]
    fn nearest(slice: &ArrayView2<f64>, y: f64, x: f64) -> f64 {
        let (height, width) = slice.dim();
        let y = (y.round() as usize).min(height - 1);
        let x = (x.round() as usize).min(width - 1);
        slice[[y, x]]
    }

    /// Resample `slice` to `(height, width)`, aligning pixel centres.
    pub(crate) fn resize(
        slice: ArrayView2<'_, f64>,
        (height, width): (usize, usize),
        interpolation: Interpolation,
    ) -> Array2<f64> {
        let (slice_height, slice_width) = slice.dim();
        if (slice_height, slice_width) == (height, width) {
            return slice.to_owned();
        }
        if slice_height == 0 || slice_width == 0 {
            return Array2::zeros((height, width));
        }

        Array2::from_shape_fn((height, width), |(y, x)| {
            let norm_x = (x as f64 + 0.5) / width as f64;
            let norm_y = (y as f64 + 0.5) / height as f64;

            let src_x = (norm_x * slice_width as f64 - 0.5).clamp(0., (slice_width - 1) as f64);
            let src_y = (norm_y * slice_height as f64 - 0.5).clamp(0., (slice_height - 1) as f64);

            match interpolation {
                Interpolation::Bilinear => Self::bilinear_interpolate(&slice, src_y, src_x),
                Interpolation::Nearest => Self::nearest(&slice, src_y, src_x),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn isotropic_dimensions_follow_finest_spacing() {
        assert_eq!(
            Interpolator::isotropic_dimensions((0.5, 0.5, 2.), (10, 64, 64)),
            (40, 64, 64)
        );
        assert_eq!(
            Interpolator::isotropic_dimensions((0., 1., 1.), (3, 4, 5)),
            (3, 4, 5)
        );
    }

    #[test]
    fn bilinear_midpoint() {
        let slice = array![[0., 10.], [20., 30.]];
        assert_eq!(
            Interpolator::bilinear_interpolate(&slice.view(), 0.5, 0.5),
            15.
        );
    }

    #[test]
    fn nearest_upsampling_repeats_pixels() {
        let slice = array![[1., 2.], [3., 4.]];
        let resized = Interpolator::resize(slice.view(), (4, 4), Interpolation::Nearest);
        assert_eq!(
            resized,
            array![
                [1., 1., 2., 2.],
                [1., 1., 2., 2.],
                [3., 3., 4., 4.],
                [3., 3., 4., 4.]
            ]
        );
    }

    #[test]
    fn bilinear_downsampling_averages() {
        let slice = array![[0., 2.], [4., 6.]];
        let resized = Interpolator::resize(slice.view(), (1, 1), Interpolation::Bilinear);
        assert_eq!(resized, array![[3.]]);
    }
}
