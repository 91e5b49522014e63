use thiserror::Error;

use crate::diagnostics::{Diagnostics, Stage};
use crate::enums::UnclassifiedVoi;
use crate::modality::ModalityStage;
use crate::photometric::PhotometricStage;
use crate::pixel::PixelArray;
use crate::record::SliceRecord;
use crate::registry::TransformStage;
use crate::voi::{VoiParams, VoiStage};
use crate::window::Window;

/// Output depth used when none is given: 8-bit grayscale.
pub const DEFAULT_DEPTH: u32 = 256;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    #[error("LUTDescriptor[2] should be 8 or 16. Got {0}")]
    LutBitWidth(i64),

    #[error("LUTDescriptor should hold 3 values. Got {0}")]
    LutDescriptor(usize),

    #[error("LUT data holds {found} entries, descriptor declares {expected}")]
    LutTooShort { expected: usize, found: usize },

    #[error("No {0} LUT sequence found")]
    MissingLut(Stage),

    #[error("Missing attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Either window center or window width not found")]
    WindowNotFound,

    #[error("Colour conversion needs 3 samples on the last axis, got shape {0:?}")]
    ChannelCount(Vec<usize>),

    #[error("Colour conversion matrix is not invertible")]
    SingularColorMatrix,

    #[error("Output depth must be at least 1")]
    InvalidDepth,
}

/// Modes chosen while transforming one image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineMetadata {
    pub modality_mode: Option<String>,
    pub unit: Option<String>,
    /// Mode of the last window processed.
    pub voi_mode: Option<String>,
    /// Mode of the last window processed.
    pub pi_mode: Option<String>,
}

/// One result per requested window, in request order.
#[derive(Debug)]
pub struct PipelineOutput {
    pub images: Vec<Result<PixelArray, TransformError>>,
    pub metadata: PipelineMetadata,
    pub diagnostics: Diagnostics,
}

/// Modality, VOI and photometric interpretation stages run in sequence.
///
/// The stages' tables are fixed once the pipeline is built, so a single
/// pipeline can be shared between threads.
#[derive(Default)]
pub struct Pipeline {
    modality: ModalityStage,
    voi: VoiStage,
    photometric: PhotometricStage,
}

impl Pipeline {
    pub fn new(unclassified_voi: UnclassifiedVoi) -> Self {
        Self {
            voi: VoiStage::new(unclassified_voi),
            ..Self::default()
        }
    }

    pub fn modality(&self) -> &ModalityStage {
        &self.modality
    }

    pub fn voi(&self) -> &VoiStage {
        &self.voi
    }

    pub fn photometric(&self) -> &PhotometricStage {
        &self.photometric
    }

    pub fn modality_mut(&mut self) -> &mut ModalityStage {
        &mut self.modality
    }

    pub fn voi_mut(&mut self) -> &mut VoiStage {
        &mut self.voi
    }

    pub fn photometric_mut(&mut self) -> &mut PhotometricStage {
        &mut self.photometric
    }

    /// Transform `image` once per window in `windows`.
    ///
    /// With `windows` set to `None` only the modality stage runs and a single
    /// image is returned. A failing window does not affect the others. A
    /// `depth` of 0 fails every window with [`TransformError::InvalidDepth`].
    pub fn transform(
        &self,
        record: &dyn SliceRecord,
        image: PixelArray,
        depth: u32,
        windows: Option<&[Window]>,
    ) -> PipelineOutput {
        let mut diagnostics = Diagnostics::new();
        let mut metadata = PipelineMetadata::default();

        let modality = match self.modality.apply(record, image, &mut diagnostics) {
            Ok(modality) => modality,
            Err(e) => {
                let count = windows.map_or(1, <[Window]>::len);
                metadata.modality_mode = self.modality.classify(record);
                return PipelineOutput {
                    images: vec![Err(e); count],
                    metadata,
                    diagnostics,
                };
            }
        };
        metadata.modality_mode = modality.mode;
        metadata.unit = modality.unit;

        let Some(windows) = windows else {
            return PipelineOutput {
                images: vec![Ok(modality.image)],
                metadata,
                diagnostics,
            };
        };

        let mut images = Vec::with_capacity(windows.len());
        for window in windows {
            if depth == 0 {
                images.push(Err(TransformError::InvalidDepth));
                continue;
            }
            let params = VoiParams {
                depth,
                window,
                unit: metadata.unit.as_deref(),
            };
            let result = self
                .voi
                .apply(record, modality.image.clone(), &params, &mut diagnostics)
                .and_then(|(voi_mode, image)| {
                    metadata.voi_mode = voi_mode;
                    self.photometric
                        .apply(record, image, depth, &mut diagnostics)
                })
                .map(|(pi_mode, image)| {
                    metadata.pi_mode = pi_mode;
                    image
                });
            if let Err(e) = &result {
                tracing::debug!("window {window} failed: {e}");
            }
            images.push(result);
        }

        PipelineOutput {
            images,
            metadata,
            diagnostics,
        }
    }
}

/// Transform `image` with the default pipeline.
pub fn transform(
    record: &dyn SliceRecord,
    image: PixelArray,
    depth: u32,
    windows: Option<&[Window]>,
) -> PipelineOutput {
    Pipeline::default().transform(record, image, depth, windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::SampleType;
    use crate::record::MemRecord;

    fn ct_record() -> MemRecord {
        MemRecord::new()
            .with_modality("CT")
            .with_rescale(1., -1024.)
            .with_window(40., 400.)
            .with_photometric_interpretation("MONOCHROME2")
    }

    #[test]
    fn one_image_per_window() {
        let record = ct_record();
        let image = PixelArray::from_vec(vec![0., 1024., 1064., 4000.], SampleType::I16);
        let windows = [
            Window::Default,
            Window::preset("lung"),
            Window::explicit(0., 1.),
        ];
        let output = transform(&record, image, DEFAULT_DEPTH, Some(&windows));

        assert_eq!(output.images.len(), 3);
        assert_eq!(output.metadata.modality_mode.as_deref(), Some("LINEAR"));
        assert_eq!(output.metadata.unit.as_deref(), Some("HU"));
        assert_eq!(output.metadata.voi_mode.as_deref(), Some("LINEAR"));
        assert_eq!(output.metadata.pi_mode.as_deref(), Some("MONOCHROME2"));

        let default = output.images[0].as_ref().unwrap();
        assert_eq!(default.data()[0], 0.);
        assert_eq!(default.data()[3], 255.);
        let lung = output.images[1].as_ref().unwrap();
        assert!(lung.data()[1] > default.data()[1]);
    }

    #[test]
    fn failures_are_isolated_per_window() {
        let record = ct_record().with_photometric_interpretation("YBR_FULL");
        let image = PixelArray::from_vec(vec![0., 1., 2., 3.], SampleType::I16);
        let output = transform(&record, image, DEFAULT_DEPTH, Some(&[Window::Default]));
        assert!(matches!(
            output.images[0],
            Err(TransformError::ChannelCount(_))
        ));

        let mut record = ct_record();
        record.window_center = None;
        record.window_width = None;
        let windows = [Window::explicit(0., 100.), Window::preset("lung")];
        record.rescale_type = Some("OD".to_string());
        let output = transform(
            &record,
            PixelArray::from_vec(vec![0.], SampleType::I16),
            DEFAULT_DEPTH,
            Some(&windows),
        );
        // without a window center the VOI stage is unclassified and both pass
        assert!(output.images.iter().all(Result::is_ok));

        let mut record = ct_record().with_window(40., 400.);
        record.rescale_type = Some("OD".to_string());
        record.window_width = None;
        let output = Pipeline::default().transform(
            &record,
            PixelArray::from_vec(vec![0.], SampleType::I16),
            DEFAULT_DEPTH,
            Some(&windows),
        );
        assert!(output.images[0].is_ok());
        assert!(matches!(
            output.images[1],
            Err(TransformError::WindowNotFound)
        ));
    }

    #[test]
    fn no_windows_skips_voi_and_photometric() {
        let record = ct_record().with_photometric_interpretation("MONOCHROME1");
        let image = PixelArray::from_vec(vec![0., 2048.], SampleType::U16);
        let output = transform(&record, image, DEFAULT_DEPTH, None);
        assert_eq!(output.images.len(), 1);
        let image = output.images[0].as_ref().unwrap();
        assert_eq!(image.data().as_slice().unwrap(), &[-1024., 1024.]);
        assert_eq!(output.metadata.voi_mode, None);
        assert_eq!(output.metadata.pi_mode, None);
    }

    #[test]
    fn zero_depth_fails_every_window() {
        let image = PixelArray::from_vec(vec![1024.], SampleType::I16);
        let output = transform(
            &ct_record(),
            image.clone(),
            0,
            Some(&[Window::Default, Window::explicit(0., 100.)]),
        );
        assert_eq!(output.images.len(), 2);
        assert!(
            output
                .images
                .iter()
                .all(|r| matches!(r, Err(TransformError::InvalidDepth)))
        );

        let output = transform(&ct_record(), image, 0, None);
        assert_eq!(output.images[0].as_ref().unwrap().data()[0], 0.);
    }

    #[test]
    fn modality_failure_fails_every_window() {
        let mut record = ct_record();
        record.rescale_intercept = None;
        record.modality_lut = Some(crate::record::LutItem {
            descriptor: crate::record::LutField::Values(vec![2, 0, 10]),
            data: crate::record::LutField::Values(vec![0, 1]),
            lut_type: None,
        });
        let output = transform(
            &record,
            PixelArray::from_vec(vec![0.], SampleType::U16),
            DEFAULT_DEPTH,
            Some(&[Window::Default, Window::preset("bone")]),
        );
        assert_eq!(output.metadata.modality_mode.as_deref(), Some("TABLE"));
        assert_eq!(output.images.len(), 2);
        assert!(
            output
                .images
                .iter()
                .all(|r| matches!(r, Err(TransformError::LutBitWidth(10))))
        );
    }
}
