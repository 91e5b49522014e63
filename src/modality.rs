//! Modality transform: stored values to physical units.
//!
//! Refer to Part 3, Section C.11.1 Modality LUT Module.

use crate::diagnostics::{Diagnostics, Stage};
use crate::lut::LookupTable;
use crate::pipeline::TransformError;
use crate::pixel::{PixelArray, SampleType};
use crate::record::SliceRecord;
use crate::registry::{Registration, Registry, TransformStage};

pub const LINEAR: &str = "LINEAR";
pub const TABLE: &str = "TABLE";

/// Unit assumed for CT images without a _Rescale Type_.
pub const HOUNSFIELD_UNIT: &str = "HU";

/// Rescales an image and reports the unit of the result.
pub type ModalityHandler =
    fn(&dyn SliceRecord, PixelArray) -> Result<(PixelArray, Option<String>), TransformError>;

/// Result of the modality stage.
#[derive(Clone, Debug)]
pub struct ModalityOutput {
    pub mode: Option<String>,
    pub image: PixelArray,
    pub unit: Option<String>,
}

pub struct ModalityStage {
    registry: Registry<ModalityHandler>,
}

impl Default for ModalityStage {
    fn default() -> Self {
        Self {
            registry: Registry::<ModalityHandler>::new(Stage::Modality)
                .with(LINEAR, modality_linear, Registration::new())
                .with(TABLE, modality_table, Registration::new()),
        }
    }
}

impl TransformStage for ModalityStage {
    type Handler = ModalityHandler;

    fn classify(&self, record: &dyn SliceRecord) -> Option<String> {
        classify_modality(record).map(str::to_string)
    }

    fn registry(&self) -> &Registry<ModalityHandler> {
        &self.registry
    }
}

impl ModalityStage {
    pub fn registry_mut(&mut self) -> &mut Registry<ModalityHandler> {
        &mut self.registry
    }

    /// Rescale `image`. Unclassified records pass through unchanged, without a unit.
    pub fn apply(
        &self,
        record: &dyn SliceRecord,
        image: PixelArray,
        diagnostics: &mut Diagnostics,
    ) -> Result<ModalityOutput, TransformError> {
        let (mode, handler) = self.resolve(record, diagnostics);
        let (image, unit) = match handler {
            Some(handler) => handler(record, image)?,
            None => (image, None),
        };
        Ok(ModalityOutput { mode, image, unit })
    }
}

/// `TABLE` when only a modality LUT is present, `LINEAR` whenever a rescale
/// intercept is present.
pub fn classify_modality(record: &dyn SliceRecord) -> Option<&'static str> {
    let has_intercept = record.rescale_intercept().is_some();
    if record.modality_lut().is_some() && !has_intercept {
        Some(TABLE)
    } else if has_intercept {
        Some(LINEAR)
    } else {
        None
    }
}

fn modality_linear(
    record: &dyn SliceRecord,
    image: PixelArray,
) -> Result<(PixelArray, Option<String>), TransformError> {
    let intercept = record
        .rescale_intercept()
        .ok_or(TransformError::MissingAttribute("RescaleIntercept"))?;
    let slope = record.rescale_slope().unwrap_or(1.);
    let unit = record.rescale_type().or_else(|| {
        record
            .modality()
            .filter(|m| m.trim() == "CT")
            .map(|_| HOUNSFIELD_UNIT.to_string())
    });
    let image = image.map_into(SampleType::F64, |v| v * slope + intercept);
    Ok((image, unit))
}

fn modality_table(
    record: &dyn SliceRecord,
    image: PixelArray,
) -> Result<(PixelArray, Option<String>), TransformError> {
    let item = record
        .modality_lut()
        .ok_or(TransformError::MissingLut(Stage::Modality))?;
    let lut = LookupTable::decode(&item, record.is_signed())?;
    let image = lut.apply(image, 1., lut.entry_type());
    Ok((image, item.lut_type))
}
