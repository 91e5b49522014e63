//! Photometric interpretation: grayscale polarity and colour spaces.
//!
//! Refer to Part 3, Section C.7.6.3.1.2 Photometric Interpretation.

use ndarray::Axis;

use crate::diagnostics::{Diagnostics, Stage};
use crate::pipeline::TransformError;
use crate::pixel::PixelArray;
use crate::record::SliceRecord;
use crate::registry::{Registration, Registry, TransformStage};

pub const MONOCHROME1: &str = "MONOCHROME1";
pub const MONOCHROME2: &str = "MONOCHROME2";
pub const RGB: &str = "RGB";
pub const YBR_FULL: &str = "YBR_FULL";
pub const YBR_FULL_422: &str = "YBR_FULL_422";
pub const YBR_PARTIAL_420: &str = "YBR_PARTIAL_420";
pub const YBR_ICT: &str = "YBR_ICT";
pub const YBR_RCT: &str = "YBR_RCT";

type Matrix3 = [[f64; 3]; 3];

/// RGB to YCbCr, full range BT.601 coefficients.
const YBR_FULL_MATRIX: Matrix3 = [
    [0.299, 0.587, 0.114],
    [-0.168736, -0.331264, 0.5],
    [0.5, -0.418688, -0.081312],
];

/// RGB to YCbCr, studio range ITU-R BT.601 coefficients.
const YBR_PARTIAL_MATRIX: Matrix3 = [
    [0.2568, 0.5041, 0.0979],
    [-0.1482, -0.2910, 0.4392],
    [0.4392, -0.3678, -0.0714],
];

/// Irreversible colour transform of JPEG 2000.
const YBR_ICT_MATRIX: Matrix3 = [
    [0.299, 0.587, 0.114],
    [-0.16875, -0.33126, 0.5],
    [0.5, -0.41869, -0.08131],
];

const YBR_OFFSET: [f64; 3] = [16., 128., 128.];
const ZERO_OFFSET: [f64; 3] = [0., 0., 0.];

pub type PhotometricHandler =
    fn(&dyn SliceRecord, PixelArray, u32) -> Result<PixelArray, TransformError>;

pub struct PhotometricStage {
    registry: Registry<PhotometricHandler>,
}

impl Default for PhotometricStage {
    fn default() -> Self {
        let experimental = Registration::new().experimental();
        Self {
            registry: Registry::<PhotometricHandler>::new(Stage::Photometric)
                .with(MONOCHROME1, pi_monochrome1, Registration::new())
                .with(MONOCHROME2, pi_identity, Registration::new())
                .with(RGB, pi_identity, Registration::new())
                .with(YBR_FULL, pi_ybr_full, Registration::new())
                .with(YBR_FULL_422, pi_ybr_full, Registration::new())
                .with(YBR_PARTIAL_420, pi_ybr_partial_420, experimental)
                .with(YBR_ICT, pi_ybr_ict, experimental)
                .with(YBR_RCT, pi_ybr_rct, experimental),
        }
    }
}

impl TransformStage for PhotometricStage {
    type Handler = PhotometricHandler;

    fn classify(&self, record: &dyn SliceRecord) -> Option<String> {
        record
            .photometric_interpretation()
            .map(|pi| pi.trim().to_string())
    }

    fn registry(&self) -> &Registry<PhotometricHandler> {
        &self.registry
    }
}

impl PhotometricStage {
    pub fn registry_mut(&mut self) -> &mut Registry<PhotometricHandler> {
        &mut self.registry
    }

    pub fn apply(
        &self,
        record: &dyn SliceRecord,
        image: PixelArray,
        depth: u32,
        diagnostics: &mut Diagnostics,
    ) -> Result<(Option<String>, PixelArray), TransformError> {
        let (mode, handler) = self.resolve(record, diagnostics);
        let image = match handler {
            Some(handler) => handler(record, image, depth)?,
            None => image,
        };
        Ok((mode, image))
    }
}

fn pi_identity(
    _record: &dyn SliceRecord,
    image: PixelArray,
    _depth: u32,
) -> Result<PixelArray, TransformError> {
    Ok(image)
}

/// Invert polarity so that the minimum value displays white.
pub fn monochrome1(image: PixelArray, depth: u32) -> PixelArray {
    let y_max = depth.saturating_sub(1) as f64;
    image.map_cast(|v| -v + y_max)
}

fn pi_monochrome1(
    _record: &dyn SliceRecord,
    image: PixelArray,
    depth: u32,
) -> Result<PixelArray, TransformError> {
    Ok(monochrome1(image, depth))
}

fn pi_ybr_full(
    _record: &dyn SliceRecord,
    image: PixelArray,
    _depth: u32,
) -> Result<PixelArray, TransformError> {
    ybr_to_rgb(image, &YBR_FULL_MATRIX, YBR_OFFSET)
}

fn pi_ybr_partial_420(
    _record: &dyn SliceRecord,
    image: PixelArray,
    _depth: u32,
) -> Result<PixelArray, TransformError> {
    ybr_to_rgb(image, &YBR_PARTIAL_MATRIX, YBR_OFFSET)
}

fn pi_ybr_ict(
    _record: &dyn SliceRecord,
    image: PixelArray,
    _depth: u32,
) -> Result<PixelArray, TransformError> {
    ybr_to_rgb(image, &YBR_ICT_MATRIX, ZERO_OFFSET)
}

fn pi_ybr_rct(
    _record: &dyn SliceRecord,
    image: PixelArray,
    _depth: u32,
) -> Result<PixelArray, TransformError> {
    map_channels(image, |[y, cb, cr]| {
        let g = y - ((cr + cb) / 4.).floor();
        [cr + g, g, cb + g].map(|c| c.clamp(0., 255.))
    })
}

/// Forward reversible colour transform, the inverse of `YBR_RCT`.
pub fn rgb_to_ybr_rct(image: PixelArray) -> Result<PixelArray, TransformError> {
    map_channels(image, |[r, g, b]| {
        [((r + 2. * g + b) / 4.).floor(), b - g, r - g]
    })
}

/// `RGB = M⁻¹ (YBR - offset)`, clamped into 8 bits.
fn ybr_to_rgb(
    image: PixelArray,
    matrix: &Matrix3,
    offset: [f64; 3],
) -> Result<PixelArray, TransformError> {
    let inverse = invert(matrix).ok_or(TransformError::SingularColorMatrix)?;
    map_channels(image, |ybr| {
        let shifted = [ybr[0] - offset[0], ybr[1] - offset[1], ybr[2] - offset[2]];
        inverse.map(|row| {
            (row[0] * shifted[0] + row[1] * shifted[1] + row[2] * shifted[2]).clamp(0., 255.)
        })
    })
}

/// Apply `f` to every sample triple on the last axis, then cast back.
fn map_channels(
    image: PixelArray,
    f: impl Fn([f64; 3]) -> [f64; 3],
) -> Result<PixelArray, TransformError> {
    let shape = image.shape().to_vec();
    if shape.last() != Some(&3) {
        return Err(TransformError::ChannelCount(shape));
    }
    let sample_type = image.sample_type();
    let mut data = image.into_data();
    let last = Axis(data.ndim() - 1);
    for mut lane in data.lanes_mut(last) {
        let out = f([lane[0], lane[1], lane[2]]);
        for (c, value) in out.into_iter().enumerate() {
            lane[c] = sample_type.cast(value);
        }
    }
    Ok(PixelArray::new(data, sample_type))
}

fn invert(m: &Matrix3) -> Option<Matrix3> {
    let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
        m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
    };
    let det = m[0][0] * cofactor(1, 2, 1, 2) - m[0][1] * cofactor(1, 2, 0, 2)
        + m[0][2] * cofactor(1, 2, 0, 1);
    if det.abs() < f64::EPSILON {
        return None;
    }
    // transposed cofactor matrix
    let adjugate = [
        [
            cofactor(1, 2, 1, 2),
            -cofactor(0, 2, 1, 2),
            cofactor(0, 1, 1, 2),
        ],
        [
            -cofactor(1, 2, 0, 2),
            cofactor(0, 2, 0, 2),
            -cofactor(0, 1, 0, 2),
        ],
        [
            cofactor(1, 2, 0, 1),
            -cofactor(0, 2, 0, 1),
            cofactor(0, 1, 0, 1),
        ],
    ];
    Some(adjugate.map(|row| row.map(|v| v / det)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::SampleType;
    use crate::record::MemRecord;
    use ndarray::{Array, ArrayD, IxDyn};

    fn rgb_image(pixels: &[[f64; 3]]) -> PixelArray {
        let flat: Vec<f64> = pixels.iter().flatten().copied().collect();
        let data = ArrayD::from_shape_vec(IxDyn(&[1, pixels.len(), 3]), flat).unwrap();
        PixelArray::new(data, SampleType::U8)
    }

    #[test]
    fn monochrome1_is_an_involution() {
        let values: Vec<f64> = (0..256).map(f64::from).collect();
        let image = PixelArray::from_vec(values.clone(), SampleType::U8);
        let inverted = monochrome1(image, 256);
        assert_eq!(inverted.data()[0], 255.);
        assert_eq!(inverted.data()[255], 0.);
        let twice = monochrome1(inverted, 256);
        assert_eq!(twice.data().as_slice().unwrap(), values.as_slice());
    }

    #[test]
    fn ybr_rct_round_trip() {
        let mut pixels = Vec::new();
        for r in (0..=255).step_by(15) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(5) {
                    pixels.push([r as f64, g as f64, b as f64]);
                }
            }
        }
        pixels.push([255., 0., 255.]);
        pixels.push([0., 255., 0.]);
        let original = rgb_image(&pixels);
        // the forward transform produces negative chroma, keep it in f64
        let encoded = rgb_to_ybr_rct(PixelArray::new(
            original.data().clone(),
            SampleType::F64,
        ))
        .unwrap();
        let decoded = pi_ybr_rct(&MemRecord::new(), encoded, 256).unwrap();
        assert_eq!(decoded.data(), original.data());
    }

    #[test]
    fn ybr_full_gray_axis() {
        // neutral chroma maps to R = G = B
        let image = rgb_image(&[[116., 128., 128.], [16., 128., 128.]]);
        let rgb = pi_ybr_full(&MemRecord::new(), image, 256).unwrap();
        let values = rgb.data().iter().copied().collect::<Vec<_>>();
        for v in &values[..3] {
            assert!((v - 100.).abs() <= 1.);
        }
        assert_eq!(&values[3..], &[0., 0., 0.]);
    }

    #[test]
    fn ybr_ict_matches_forward_matrix() {
        let (r, g, b) = (200., 50., 10.);
        let m = YBR_ICT_MATRIX;
        let ybr = m.map(|row| row[0] * r + row[1] * g + row[2] * b);
        let image = PixelArray::new(
            Array::from_shape_vec(IxDyn(&[1, 3]), ybr.to_vec()).unwrap(),
            SampleType::F64,
        );
        let rgb = pi_ybr_ict(&MemRecord::new(), image, 256).unwrap();
        let rgb: Vec<f64> = rgb.data().iter().copied().collect();
        for (got, want) in rgb.iter().zip([r, g, b]) {
            assert!((got - want).abs() < 1e-3, "{got} != {want}");
        }
    }

    #[test]
    fn colour_conversion_needs_three_channels() {
        let image = PixelArray::from_vec(vec![1., 2.], SampleType::U8);
        let result = pi_ybr_full(&MemRecord::new(), image, 256);
        assert!(matches!(result, Err(TransformError::ChannelCount(shape)) if shape == vec![2]));
    }

    #[test]
    fn experimental_modes_are_flagged() {
        let stage = PhotometricStage::default();
        let record = MemRecord::new().with_photometric_interpretation("YBR_ICT");
        let mut diagnostics = Diagnostics::new();
        let (mode, handler) = stage.resolve(&record, &mut diagnostics);
        assert_eq!(mode.as_deref(), Some(YBR_ICT));
        assert!(handler.is_some());
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn unknown_interpretation_is_identity() {
        let stage = PhotometricStage::default();
        let record = MemRecord::new().with_photometric_interpretation("PALETTE COLOR");
        let image = PixelArray::from_vec(vec![3.], SampleType::U8);
        let (mode, out) = stage
            .apply(&record, image.clone(), 256, &mut Diagnostics::new())
            .unwrap();
        assert_eq!(mode.as_deref(), Some("PALETTE COLOR"));
        assert_eq!(out, image);
    }
}
