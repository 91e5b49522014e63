use crate::enums::{Interpolation, UnclassifiedVoi};
use crate::interpolator::Interpolator;
use crate::pipeline::{DEFAULT_DEPTH, Pipeline, TransformError};
use crate::pixel::PixelArray;
use crate::reconstruction::{Reconstruction, ReconstructionError, reconstruct};
use crate::record::SliceRecord;
use crate::volume::Volume;
use crate::window::Window;

use dicom::object::{FileDicomObject, InMemDicomObject, open_file};
use ndarray::{Array2, Array3, Ix2, s};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Instance {index}: expected a single-channel 2D image, got shape {shape:?}")]
    NotPlanar { index: i64, shape: Vec<usize> },

    #[error("Instance {0}: no pixel data")]
    MissingPixelData(i64),

    #[error("Instance {index}: {source}")]
    Transform {
        index: i64,
        #[source]
        source: TransformError,
    },

    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// Where the pixels of a slice come from when they are not in its record.
pub trait PixelSource<K> {
    /// `Ok(None)` lets the loader fall back to the record's own pixels.
    fn read_pixels(&self, key: &K) -> Result<Option<PixelArray>, VolumeError>;
}

/// Pixels always come from the records.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStorage;

impl<K> PixelSource<K> for NoStorage {
    fn read_pixels(&self, _key: &K) -> Result<Option<PixelArray>, VolumeError> {
        Ok(None)
    }
}

/// Keys are paths of DICOM files, read again when the pixels are needed.
/// Keys that are not existing files fall back to the record's pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStorage;

impl<K: AsRef<Path>> PixelSource<K> for FileStorage {
    fn read_pixels(&self, key: &K) -> Result<Option<PixelArray>, VolumeError> {
        if !key.as_ref().is_file() {
            return Ok(None);
        }
        let object = open_file(key.as_ref())?;
        Ok(object.pixel_array())
    }
}

/// How slices are transformed and resampled into a volume.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeOptions {
    /// Target (rows, columns) of every slice.
    pub resize: Option<(usize, usize)>,
    pub interpolation: Interpolation,
    pub depth: u32,
    /// `None` (the default) keeps the modality output, e.g. HU for CT, and
    /// skips the VOI and photometric stages.
    pub window: Option<Window>,
    pub unclassified_voi: UnclassifiedVoi,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            resize: None,
            interpolation: Interpolation::default(),
            depth: DEFAULT_DEPTH,
            window: None,
            unclassified_voi: UnclassifiedVoi::default(),
        }
    }
}

impl VolumeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resize(mut self, rows: usize, columns: usize) -> Self {
        self.resize = Some((rows, columns));
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_window(mut self, window: impl Into<Window>) -> Self {
        self.window = Some(window.into());
        self
    }

    pub fn without_window(mut self) -> Self {
        self.window = None;
        self
    }

    pub fn with_unclassified_voi(mut self, unclassified_voi: UnclassifiedVoi) -> Self {
        self.unclassified_voi = unclassified_voi;
        self
    }
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Transform the slices of a reconstruction and stack them in order.
    ///
    /// # Errors
    ///
    /// Returns error if a slice has no pixels, fails to transform, is not a
    /// single-channel 2D image or differs in size from the others.
    pub fn build_volume<K, R, S>(
        reconstruction: &Reconstruction<K, R>,
        source: &S,
        options: &VolumeOptions,
    ) -> Result<Volume, VolumeError>
    where
        R: SliceRecord,
        S: PixelSource<K> + ?Sized,
    {
        let pipeline = Pipeline::new(options.unclassified_voi);
        let windows = options.window.as_ref().map(std::slice::from_ref);

        let mut images = Vec::with_capacity(reconstruction.len());
        for (index, key, record) in reconstruction.iter() {
            let pixels = match source.read_pixels(key)? {
                Some(pixels) => pixels,
                None => record
                    .pixel_array()
                    .ok_or(VolumeError::MissingPixelData(index))?,
            };
            let output = pipeline.transform(record, pixels, options.depth, windows);
            let image = output
                .images
                .into_iter()
                .next()
                .ok_or(VolumeError::MissingPixelData(index))?
                .map_err(|e| VolumeError::Transform { index, source: e })?;
            let image = Self::to_plane(index, image)?;
            let image = match options.resize {
                Some(size) => Interpolator::resize(image.view(), size, options.interpolation),
                None => image,
            };
            images.push(image);
        }

        if images.is_empty() {
            return Err(VolumeError::NoValidImages);
        }
        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let mut volume = Volume::new(volume_array, Self::get_spacing(reconstruction, options));
        if options.window.is_some() {
            volume = volume.with_range((0., options.depth.saturating_sub(1) as f64));
        }
        Ok(volume)
    }

    /// Reconstruct and load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - DICOM file objects of one series
    /// * `options` - How the slices are transformed
    pub fn load_from_dicom_objects(
        dicom_objects: Vec<FileDicomObject<InMemDicomObject>>,
        options: &VolumeOptions,
    ) -> Result<Volume, VolumeError> {
        if dicom_objects.is_empty() {
            return Err(VolumeError::NoValidImages);
        }
        let reconstruction = reconstruct(dicom_objects.into_iter().enumerate(), None)?;
        Self::build_volume(&reconstruction, &NoStorage, options)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        options: &VolumeOptions,
    ) -> Result<Volume, VolumeError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(objects?, options)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        options: &VolumeOptions,
    ) -> Result<Volume, VolumeError> {
        let paths: Vec<PathBuf> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, options)
    }

    fn to_plane(index: i64, image: PixelArray) -> Result<Array2<f64>, VolumeError> {
        let shape = image.shape().to_vec();
        image
            .into_data()
            .into_dimensionality::<Ix2>()
            .map_err(|_| VolumeError::NotPlanar { index, shape })
    }

    fn validate_dimensions(images: &[Array2<f64>]) -> Result<(), VolumeError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<f64>]) -> Array3<f64> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<f64>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    /// (x, y, z) spacing, adjusted for resizing.
    fn get_spacing<K, R: SliceRecord>(
        reconstruction: &Reconstruction<K, R>,
        options: &VolumeOptions,
    ) -> (f64, f64, f64) {
        let mut x = reconstruction.spacing_i;
        let mut y = reconstruction.spacing_j;
        if let (Some((rows, columns)), Some(original_rows), Some(original_columns)) = (
            options.resize,
            reconstruction.rows,
            reconstruction.columns,
        ) {
            if rows > 0 && columns > 0 {
                x *= original_columns as f64 / columns as f64;
                y *= original_rows as f64 / rows as f64;
            }
        }
        let z = reconstruction
            .slice_spacing()
            .or(reconstruction.slice_thickness)
            .unwrap_or(1.0);
        (x, y, z)
    }
}
