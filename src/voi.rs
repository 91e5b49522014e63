//! Value of interest (VOI) transform: physical units to display values.
//!
//! Refer to Part 3, Section C.11.2 VOI LUT Module.

use crate::diagnostics::{Diagnostics, Stage};
use crate::enums::UnclassifiedVoi;
use crate::lut::LookupTable;
use crate::modality::{HOUNSFIELD_UNIT, classify_modality};
use crate::pipeline::TransformError;
use crate::pixel::{PixelArray, SampleType};
use crate::record::SliceRecord;
use crate::registry::{Registration, Registry, TransformStage};
use crate::window::{Window, preset_window};

pub const LINEAR: &str = "LINEAR";
pub const LINEAR_EXACT: &str = "LINEAR_EXACT";
pub const SIGMOID: &str = "SIGMOID";
pub const TABLE: &str = "TABLE";

/// _Bits Stored_ assumed when a record does not declare it.
pub const DEFAULT_BITS_STORED: u16 = 12;

/// Per-call parameters of a VOI handler.
#[derive(Clone, Copy, Debug)]
pub struct VoiParams<'a> {
    /// Number of output levels, e.g. 256 for 8-bit output.
    pub depth: u32,
    pub window: &'a Window,
    /// Unit produced by the modality stage.
    pub unit: Option<&'a str>,
}

pub type VoiHandler =
    fn(&dyn SliceRecord, PixelArray, &VoiParams<'_>) -> Result<PixelArray, TransformError>;

pub struct VoiStage {
    registry: Registry<VoiHandler>,
    unclassified: UnclassifiedVoi,
}

impl Default for VoiStage {
    fn default() -> Self {
        Self::new(UnclassifiedVoi::default())
    }
}

impl TransformStage for VoiStage {
    type Handler = VoiHandler;

    fn classify(&self, record: &dyn SliceRecord) -> Option<String> {
        let has_center = record.window_center().is_some();
        if record.voi_lut().is_some() && !has_center {
            Some(TABLE.to_string())
        } else if has_center {
            Some(
                record
                    .voi_lut_function()
                    .map(|f| f.trim().to_string())
                    .unwrap_or_else(|| LINEAR.to_string()),
            )
        } else {
            match self.unclassified {
                UnclassifiedVoi::Identity => None,
                UnclassifiedVoi::Linear => Some(LINEAR.to_string()),
            }
        }
    }

    fn registry(&self) -> &Registry<VoiHandler> {
        &self.registry
    }
}

impl VoiStage {
    pub fn new(unclassified: UnclassifiedVoi) -> Self {
        Self {
            registry: Registry::<VoiHandler>::new(Stage::Voi)
                .with(LINEAR, voi_linear, Registration::new())
                .with(LINEAR_EXACT, voi_linear_exact, Registration::new())
                .with(SIGMOID, voi_sigmoid, Registration::new())
                .with(TABLE, voi_table, Registration::new()),
            unclassified,
        }
    }

    pub fn registry_mut(&mut self) -> &mut Registry<VoiHandler> {
        &mut self.registry
    }

    /// Window `image` into `params.depth` levels.
    pub fn apply(
        &self,
        record: &dyn SliceRecord,
        image: PixelArray,
        params: &VoiParams<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(Option<String>, PixelArray), TransformError> {
        let (mode, handler) = self.resolve(record, diagnostics);
        let image = match handler {
            Some(handler) => handler(record, image, params)?,
            None => image,
        };
        Ok((mode, image))
    }
}

/// Determine the window center and width to use for `record`.
pub fn resolve_window(
    record: &dyn SliceRecord,
    window: &Window,
    unit: Option<&str>,
) -> Result<(f64, f64), TransformError> {
    match window {
        Window::Explicit { center, width } => Ok((*center, *width)),
        Window::Default => Ok(record_window_or_default(record)),
        _ if unit.is_none() => Ok(record_window_or_default(record)),
        Window::Preset(name) if unit == Some(HOUNSFIELD_UNIT) => Ok(preset_window(name)),
        Window::Preset(_) => match record_window(record) {
            (Some(center), Some(width)) => Ok((center, width)),
            _ => Err(TransformError::WindowNotFound),
        },
    }
}

fn record_window(record: &dyn SliceRecord) -> (Option<f64>, Option<f64>) {
    let first = |values: Option<Vec<f64>>| values.and_then(|v| v.first().copied());
    (first(record.window_center()), first(record.window_width()))
}

fn record_window_or_default(record: &dyn SliceRecord) -> (f64, f64) {
    let bits = record.bits_stored().unwrap_or(DEFAULT_BITS_STORED);
    let (center, width) = record_window(record);
    (
        center.unwrap_or_else(|| 2f64.powi(bits as i32 - 1)),
        width.unwrap_or_else(|| 2f64.powi(bits as i32)),
    )
}

/// `LINEAR`, Part 3, Section C.11.2.1.2.1.
pub fn window_linear(value: f64, center: f64, width: f64, depth: u32) -> f64 {
    let y_max = depth.saturating_sub(1) as f64;
    let center = center - 0.5;
    let width = width - 1.;
    let half_width = width / 2.;
    let y = if value <= center - half_width {
        0.
    } else if value > center + half_width {
        y_max
    } else {
        ((value - center) / width + 0.5) * y_max
    };
    y.clamp(0., y_max)
}

/// `LINEAR_EXACT`, Part 3, Section C.11.2.1.3.2.
pub fn window_linear_exact(value: f64, center: f64, width: f64, depth: u32) -> f64 {
    let y_max = depth.saturating_sub(1) as f64;
    let y = if value <= center - width / 2. {
        0.
    } else if value > center + width / 2. {
        y_max
    } else {
        ((value - center) / width + 0.5) * y_max
    };
    y.clamp(0., y_max)
}

/// `SIGMOID`, Part 3, Section C.11.2.1.3.1.
pub fn window_sigmoid(value: f64, center: f64, width: f64, depth: u32) -> f64 {
    depth.saturating_sub(1) as f64 / (1. + f64::exp(-4. * (value - center) / width))
}

fn apply_window(
    record: &dyn SliceRecord,
    image: PixelArray,
    params: &VoiParams<'_>,
    law: fn(f64, f64, f64, u32) -> f64,
) -> Result<PixelArray, TransformError> {
    let (center, width) = resolve_window(record, params.window, params.unit)?;
    let depth = params.depth;
    Ok(image.map_cast(|v| law(v, center, width, depth)))
}

fn voi_linear(
    record: &dyn SliceRecord,
    image: PixelArray,
    params: &VoiParams<'_>,
) -> Result<PixelArray, TransformError> {
    apply_window(record, image, params, window_linear)
}

fn voi_linear_exact(
    record: &dyn SliceRecord,
    image: PixelArray,
    params: &VoiParams<'_>,
) -> Result<PixelArray, TransformError> {
    apply_window(record, image, params, window_linear_exact)
}

fn voi_sigmoid(
    record: &dyn SliceRecord,
    image: PixelArray,
    params: &VoiParams<'_>,
) -> Result<PixelArray, TransformError> {
    apply_window(record, image, params, window_sigmoid)
}

fn voi_table(
    record: &dyn SliceRecord,
    image: PixelArray,
    params: &VoiParams<'_>,
) -> Result<PixelArray, TransformError> {
    let item = record
        .voi_lut()
        .ok_or(TransformError::MissingLut(Stage::Voi))?;
    let unsigned =
        classify_modality(record).is_none() && record.pixel_representation() == Some(0);
    let lut = LookupTable::decode(&item, !unsigned)?;
    let bits = record.bits_stored().unwrap_or(DEFAULT_BITS_STORED);
    let scale = params.depth as f64 / 2f64.powi(bits as i32);
    Ok(lut.apply(image, scale, SampleType::F64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LutField, LutItem, MemRecord};
    use rstest::rstest;

    const DEPTH: u32 = 256;

    #[rstest]
    #[case(window_linear as fn(f64, f64, f64, u32) -> f64)]
    #[case(window_linear_exact as fn(f64, f64, f64, u32) -> f64)]
    fn linear_laws_are_monotonic_and_saturate(#[case] law: fn(f64, f64, f64, u32) -> f64) {
        let (center, width) = (40., 400.);
        assert_eq!(law(-1000., center, width, DEPTH), 0.);
        assert_eq!(law(center - width, center, width, DEPTH), 0.);
        assert_eq!(law(center + width, center, width, DEPTH), 255.);
        assert_eq!(law(5000., center, width, DEPTH), 255.);

        let mut previous = f64::MIN;
        for v in -200..=260 {
            let y = law(v as f64, center, width, DEPTH);
            assert!(y >= previous, "not monotonic at {v}");
            assert!((0. ..=255.).contains(&y));
            previous = y;
        }
    }

    #[test]
    fn midpoint_at_center() {
        let (center, width) = (40., 400.);
        assert_eq!(window_linear_exact(center, center, width, DEPTH), 127.5);
        let expected = (0.5 / (width - 1.) + 0.5) * 255.;
        assert!((window_linear(center, center, width, DEPTH) - expected).abs() < 1e-9);
        assert!((window_linear(center, center, width, DEPTH) - 127.5).abs() < 1.);
        assert!((window_sigmoid(center, center, width, DEPTH) - 127.5).abs() < 1e-9);
    }

    #[test]
    fn sigmoid_approaches_bounds() {
        let (center, width) = (40., 400.);
        assert!(window_sigmoid(center - 5. * width, center, width, DEPTH) < 1e-6);
        assert!((window_sigmoid(center + 5. * width, center, width, DEPTH) - 255.).abs() < 1e-6);
        // one quarter width out: 255 / (1 + e^-1)
        let above = window_sigmoid(center + width / 4., center, width, DEPTH);
        assert!((above - 255. / (1. + (-1f64).exp())).abs() < 1e-9);
        let below = window_sigmoid(center - width / 4., center, width, DEPTH);
        assert!((above + below - 255.).abs() < 1e-9);
    }

    #[rstest]
    #[case(window_linear as fn(f64, f64, f64, u32) -> f64)]
    #[case(window_linear_exact as fn(f64, f64, f64, u32) -> f64)]
    #[case(window_sigmoid as fn(f64, f64, f64, u32) -> f64)]
    fn zero_depth_maps_to_zero(#[case] law: fn(f64, f64, f64, u32) -> f64) {
        for v in [-5000., 40., 5000.] {
            assert_eq!(law(v, 40., 400., 0), 0.);
        }
    }

    #[test]
    fn resolve_window_sources() {
        let record = MemRecord::new().with_window(50., 350.);
        assert_eq!(
            resolve_window(&record, &Window::explicit(-600., 1200.), Some("HU")).unwrap(),
            (-600., 1200.)
        );
        assert_eq!(
            resolve_window(&record, &Window::Default, Some("HU")).unwrap(),
            (50., 350.)
        );
        assert_eq!(
            resolve_window(&record, &Window::preset("lung"), Some("HU")).unwrap(),
            (-750., 1500.)
        );
        assert_eq!(
            resolve_window(&record, &Window::preset("unknown"), Some("HU")).unwrap(),
            (0., 2000.)
        );
        // presets only make sense in HU, anything else uses the record
        assert_eq!(
            resolve_window(&record, &Window::preset("lung"), Some("OD")).unwrap(),
            (50., 350.)
        );
        assert_eq!(
            resolve_window(&record, &Window::preset("lung"), None).unwrap(),
            (50., 350.)
        );
    }

    #[test]
    fn resolve_window_falls_back_to_bit_depth() {
        let mut record = MemRecord::new();
        record.bits_stored = Some(10);
        assert_eq!(
            resolve_window(&record, &Window::Default, Some("HU")).unwrap(),
            (512., 1024.)
        );
        assert!(matches!(
            resolve_window(&record, &Window::preset("lung"), Some("OD")),
            Err(TransformError::WindowNotFound)
        ));
    }

    #[test]
    fn classification() {
        let stage = VoiStage::default();
        let mut record = MemRecord::new();
        assert_eq!(stage.classify(&record), None);
        assert_eq!(
            VoiStage::new(UnclassifiedVoi::Linear).classify(&record).as_deref(),
            Some(LINEAR)
        );

        record.voi_lut = Some(LutItem {
            descriptor: LutField::Values(vec![1, 0, 8]),
            data: LutField::Values(vec![0]),
            lut_type: None,
        });
        assert_eq!(stage.classify(&record).as_deref(), Some(TABLE));

        record.window_center = Some(vec![10.]);
        assert_eq!(stage.classify(&record).as_deref(), Some(LINEAR));

        record.voi_lut_function = Some("SIGMOID".to_string());
        assert_eq!(stage.classify(&record).as_deref(), Some(SIGMOID));
    }

    #[test]
    fn linear_casts_back_to_sample_type() {
        let record = MemRecord::new().with_window(100., 200.);
        let image = PixelArray::from_vec(vec![0., 100., 150., 300.], SampleType::U16);
        let params = VoiParams {
            depth: DEPTH,
            window: &Window::Default,
            unit: None,
        };
        let (mode, out) = VoiStage::default()
            .apply(&record, image, &params, &mut Diagnostics::new())
            .unwrap();
        assert_eq!(mode.as_deref(), Some(LINEAR));
        assert_eq!(out.sample_type(), SampleType::U16);
        for v in out.data() {
            assert_eq!(v.fract(), 0.);
        }
        assert_eq!(out.data()[0], 0.);
        assert_eq!(out.data()[3], 255.);
    }

    #[test]
    fn table_scales_by_bits_stored() {
        let mut record = MemRecord::new();
        record.bits_stored = Some(8);
        record.pixel_representation = Some(0);
        record.voi_lut = Some(LutItem {
            descriptor: LutField::Bytes(vec![2, 0, 0, 0, 8, 0]),
            data: LutField::Bytes(vec![64, 128]),
            lut_type: None,
        });
        let params = VoiParams {
            depth: 16,
            window: &Window::Default,
            unit: None,
        };
        let (mode, out) = VoiStage::default()
            .apply(
                &record,
                PixelArray::from_vec(vec![0., 1., 5.], SampleType::U8),
                &params,
                &mut Diagnostics::new(),
            )
            .unwrap();
        assert_eq!(mode.as_deref(), Some(TABLE));
        assert_eq!(out.sample_type(), SampleType::F64);
        assert_eq!(out.data().as_slice().unwrap(), &[4., 8., 8.]);
    }
}
