//! # DICOM transform library
//!
//! This crate turns stored DICOM pixel data into display-ready images and
//! reconstructs series of 2D slices into volumes.
//!
//! This library is part of the dicom-rs ecosystem. Slices are read through
//! the [`SliceRecord`] trait, which is implemented for
//! [`FileDicomObject<InMemDicomObject>`] and for the in-memory [`MemRecord`].
//!
//! Every image goes through three stages, each of which picks its algorithm
//! from the attributes of the slice:
//!  - Modality: stored values to physical units (rescale or modality LUT)
//!  - VOI: physical units to `depth` display levels (windowing or VOI LUT)
//!  - Photometric interpretation: `MONOCHROME1` inversion and YBR colour
//!    conversions
//!
//! Series reconstruction orders the slices of a series by _Instance
//! Number_, rejects geometrically inconsistent series and classifies the
//! acquisition plane. CT series need at least two aligned slices, CR and DX
//! exactly one image. The resulting volume can be sliced in the three
//! medical axes:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//! The [`scan`] module walks a directory tree, groups the files by
//! patient, study and series and reconstructs every series, optionally in
//! parallel using rayon.
//!
//! Warnings (unclassified slices, coincident slices, experimental modes)
//! are returned as [`Diagnostics`] and also emitted as `tracing` events.
//!
//! # Examples
//!
//! ## Windowing a single slice
//!
//! ```no_run
//! # use dicom_trans::{DEFAULT_DEPTH, Pipeline, SliceRecord, Window};
//! let object = dicom::object::open_file("slice.dcm").expect("should have opened file");
//! let image = object.pixel_array().expect("should have decoded pixel data");
//! let output = Pipeline::default().transform(
//!     &object,
//!     image,
//!     DEFAULT_DEPTH,
//!     Some(&[Window::Default, Window::preset("lung")]),
//! );
//! for image in output.images {
//!     println!("{:?}", image.map(|image| image.shape().to_vec()));
//! }
//! ```
//!
//! ## Reading every series of a directory into volumes
//!
//! Reconstruct all series found below the dicom/ directory and save the
//! image at the center of each volume in the Sagittal axis.
//!
//! ```no_run
//! # use dicom_trans::{FileStorage, Interpolation, Orientation, Parallelism, VolumeLoader, VolumeOptions, Window};
//! # use dicom_trans::scan::scan_and_reconstruct;
//! let series = scan_and_reconstruct("dicom", Parallelism::Rayon)
//!     .expect("should have scanned directory");
//! for (key, reconstruction) in series {
//!     let Ok(reconstruction) = reconstruction else { continue };
//!     let options = VolumeOptions::new().with_window(Window::Default);
//!     let volume = VolumeLoader::build_volume(&reconstruction, &FileStorage, &options)
//!         .expect("should have built volume");
//!     let image = volume
//!         .get_image_from_axis(
//!             volume.dim().2 / 2,
//!             Orientation::Sagittal,
//!             Some(Interpolation::Bilinear),
//!         )
//!         .expect("should have returned image at center of volume");
//!     image
//!         .save(format!("{}.png", key.series_instance_uid))
//!         .expect("should have saved image");
//! }
//! ```
//!
//! [`FileDicomObject<InMemDicomObject>`]: https://docs.rs/dicom-object/latest/dicom_object/struct.FileDicomObject.html

pub mod diagnostics;
pub mod dicom_record;
pub mod enums;
mod interpolator;
pub mod lut;
pub mod modality;
pub mod photometric;
pub mod pipeline;
pub mod pixel;
pub mod reconstruction;
pub mod record;
pub mod registry;
pub mod scan;
pub mod voi;
pub mod volume;
pub mod volume_loader;
pub mod window;

pub use diagnostics::{Diagnostics, Stage, Warning};
pub use enums::{Chirality, Interpolation, Orientation, Parallelism, SeriesLike, UnclassifiedVoi};
pub use pipeline::{DEFAULT_DEPTH, Pipeline, PipelineMetadata, PipelineOutput, TransformError};
pub use pixel::{PixelArray, SampleType};
pub use reconstruction::{Reconstruction, ReconstructionError, SeriesInfo, reconstruct};
pub use record::{LutField, LutItem, MemRecord, SliceRecord};
pub use registry::{Registration, Registry, TransformStage};
pub use volume::Volume;
pub use volume_loader::{FileStorage, NoStorage, PixelSource, VolumeError, VolumeLoader, VolumeOptions};
pub use window::{PRESET_WINDOWS, Window, preset_window};
