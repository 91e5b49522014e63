use crate::enums::Interpolation;
use crate::enums::Orientation;
use crate::interpolator::Interpolator;

use image::GrayImage;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;

/// A stack of transformed slices, indexed (depth, height, width).
#[derive(Clone, Debug, Default)]
pub struct Volume {
    pub data: Array3<f64>,
    /// Voxel spacing in mm as (x, y, z): between columns, between rows and
    /// between slices.
    pub spacing: (f64, f64, f64),
    /// Values mapped to black and white by the 8-bit export.
    pub range: (f64, f64),
    pub interpolated_dim: (usize, usize, usize),
}

impl Volume {
    /// The export range is taken from the data.
    pub fn new(data: Array3<f64>, spacing: (f64, f64, f64)) -> Self {
        let range = data
            .iter()
            .fold(None, |range: Option<(f64, f64)>, &v| match range {
                Some((min, max)) => Some((min.min(v), max.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or((0., 0.));
        let original_dim = data.dim();
        Self {
            data,
            spacing,
            range,
            interpolated_dim: Interpolator::isotropic_dimensions(spacing, original_dim),
        }
    }

    pub fn with_range(mut self, range: (f64, f64)) -> Self {
        self.range = range;
        self
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    #[inline]
    fn normalize_to_u8(value: f64, (min, max): (f64, f64)) -> u8 {
        if max <= min {
            return 0;
        }
        ((value - min) / (max - min) * 255.0).clamp(0.0, 255.0) as u8
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, f64>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice = match orientation {
            Orientation::Axial => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
            Orientation::Sagittal => self.data.slice(s![.., .., index]),
        };
        Some(slice)
    }

    fn get_output_dimensions(&self, orientation: Orientation) -> (usize, usize) {
        // (height, width)
        let (depth, height, width) = self.interpolated_dim;
        match orientation {
            Orientation::Axial => (height, width),
            Orientation::Coronal => (depth, width),
            Orientation::Sagittal => (depth, height),
        }
    }

    fn slice_to_image(&self, slice: &ArrayView2<'_, f64>) -> Option<GrayImage> {
        let (height, width) = slice.dim();
        let range = self.range;
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| Self::normalize_to_u8(v, range))
            .collect();
        GrayImage::from_raw(width as u32, height as u32, pixel_data)
    }

    /// 8-bit image of a slice along `orientation`.
    ///
    /// With an interpolation the slice is resampled so that its pixels are
    /// square; without, the stored samples are exported as they are.
    pub fn get_image_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
        interpolation: Option<Interpolation>,
    ) -> Option<GrayImage> {
        let slice = self.get_slice_from_axis(index, orientation)?;
        match interpolation {
            None => self.slice_to_image(&slice),
            Some(interpolation) => {
                let size = self.get_output_dimensions(orientation);
                let resized = Interpolator::resize(slice, size, interpolation);
                self.slice_to_image(&resized.view())
            }
        }
    }

    fn is_valid_index(&self, index: usize, orientation: Orientation) -> bool {
        let dim = self.data.dim();
        let max_index = match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        };
        index < max_index
    }
}
