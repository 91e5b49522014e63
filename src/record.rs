use crate::pixel::PixelArray;

/// A LUT attribute as found in a data set: either already decoded into
/// integers, or still packed in a byte buffer (little endian).
#[derive(Clone, Debug, PartialEq)]
pub enum LutField {
    Values(Vec<i64>),
    Bytes(Vec<u8>),
}

/// One item of a _Modality LUT Sequence_ or _VOI LUT Sequence_.
#[derive(Clone, Debug, PartialEq)]
pub struct LutItem {
    pub descriptor: LutField,
    pub data: LutField,
    /// _Modality LUT Type_ (modality LUTs) or _LUT Explanation_ (VOI LUTs).
    pub lut_type: Option<String>,
}

/// Read-only access to the metadata of a single image slice.
///
/// Every getter is optional: a missing attribute is `None`, never an error.
/// Multi-valued attributes return all their values.
pub trait SliceRecord {
    fn instance_number(&self) -> Option<i64>;
    fn modality(&self) -> Option<String>;
    fn image_orientation(&self) -> Option<[f64; 6]>;
    fn image_position(&self) -> Option<[f64; 3]>;
    /// _Pixel Spacing_ as (row spacing, column spacing) in mm.
    fn pixel_spacing(&self) -> Option<[f64; 2]>;
    fn rows(&self) -> Option<u32>;
    fn columns(&self) -> Option<u32>;
    fn bits_allocated(&self) -> Option<u16>;
    fn bits_stored(&self) -> Option<u16>;
    /// 0 for unsigned samples, 1 for two's complement.
    fn pixel_representation(&self) -> Option<u16>;
    fn rescale_slope(&self) -> Option<f64>;
    fn rescale_intercept(&self) -> Option<f64>;
    fn rescale_type(&self) -> Option<String>;
    fn contrast_bolus_agent(&self) -> Option<String>;
    fn photometric_interpretation(&self) -> Option<String>;
    fn window_center(&self) -> Option<Vec<f64>>;
    fn window_width(&self) -> Option<Vec<f64>>;
    fn voi_lut_function(&self) -> Option<String>;
    /// First item of the _Modality LUT Sequence_.
    fn modality_lut(&self) -> Option<LutItem>;
    /// First item of the _VOI LUT Sequence_.
    fn voi_lut(&self) -> Option<LutItem>;
    fn view_position(&self) -> Option<String>;
    fn series_description(&self) -> Option<String>;
    fn slice_thickness(&self) -> Option<f64>;
    fn patient_position(&self) -> Option<String>;
    fn patient_id(&self) -> Option<String>;
    fn study_instance_uid(&self) -> Option<String>;
    fn series_instance_uid(&self) -> Option<String>;
    /// Stored pixel values of the first frame, if they are available in memory.
    fn pixel_array(&self) -> Option<PixelArray>;

    fn is_signed(&self) -> bool {
        self.pixel_representation() == Some(1)
    }
}

/// A slice record assembled in memory, e.g. from a database row or in tests.
#[derive(Clone, Debug, Default)]
pub struct MemRecord {
    pub instance_number: Option<i64>,
    pub modality: Option<String>,
    pub image_orientation: Option<[f64; 6]>,
    pub image_position: Option<[f64; 3]>,
    pub pixel_spacing: Option<[f64; 2]>,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub bits_allocated: Option<u16>,
    pub bits_stored: Option<u16>,
    pub pixel_representation: Option<u16>,
    pub rescale_slope: Option<f64>,
    pub rescale_intercept: Option<f64>,
    pub rescale_type: Option<String>,
    pub contrast_bolus_agent: Option<String>,
    pub photometric_interpretation: Option<String>,
    pub window_center: Option<Vec<f64>>,
    pub window_width: Option<Vec<f64>>,
    pub voi_lut_function: Option<String>,
    pub modality_lut: Option<LutItem>,
    pub voi_lut: Option<LutItem>,
    pub view_position: Option<String>,
    pub series_description: Option<String>,
    pub slice_thickness: Option<f64>,
    pub patient_position: Option<String>,
    pub patient_id: Option<String>,
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub pixels: Option<PixelArray>,
}

impl MemRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance_number(mut self, instance_number: i64) -> Self {
        self.instance_number = Some(instance_number);
        self
    }

    pub fn with_modality(mut self, modality: &str) -> Self {
        self.modality = Some(modality.to_string());
        self
    }

    pub fn with_geometry(mut self, orientation: [f64; 6], position: [f64; 3]) -> Self {
        self.image_orientation = Some(orientation);
        self.image_position = Some(position);
        self
    }

    pub fn with_size(mut self, rows: u32, columns: u32, pixel_spacing: [f64; 2]) -> Self {
        self.rows = Some(rows);
        self.columns = Some(columns);
        self.pixel_spacing = Some(pixel_spacing);
        self
    }

    pub fn with_rescale(mut self, slope: f64, intercept: f64) -> Self {
        self.rescale_slope = Some(slope);
        self.rescale_intercept = Some(intercept);
        self
    }

    pub fn with_window(mut self, center: f64, width: f64) -> Self {
        self.window_center = Some(vec![center]);
        self.window_width = Some(vec![width]);
        self
    }

    pub fn with_photometric_interpretation(mut self, value: &str) -> Self {
        self.photometric_interpretation = Some(value.to_string());
        self
    }

    pub fn with_pixels(mut self, pixels: PixelArray) -> Self {
        self.pixels = Some(pixels);
        self
    }
}

impl SliceRecord for MemRecord {
    fn instance_number(&self) -> Option<i64> {
        self.instance_number
    }
    fn modality(&self) -> Option<String> {
        self.modality.clone()
    }
    fn image_orientation(&self) -> Option<[f64; 6]> {
        self.image_orientation
    }
    fn image_position(&self) -> Option<[f64; 3]> {
        self.image_position
    }
    fn pixel_spacing(&self) -> Option<[f64; 2]> {
        self.pixel_spacing
    }
    fn rows(&self) -> Option<u32> {
        self.rows
    }
    fn columns(&self) -> Option<u32> {
        self.columns
    }
    fn bits_allocated(&self) -> Option<u16> {
        self.bits_allocated
    }
    fn bits_stored(&self) -> Option<u16> {
        self.bits_stored
    }
    fn pixel_representation(&self) -> Option<u16> {
        self.pixel_representation
    }
    fn rescale_slope(&self) -> Option<f64> {
        self.rescale_slope
    }
    fn rescale_intercept(&self) -> Option<f64> {
        self.rescale_intercept
    }
    fn rescale_type(&self) -> Option<String> {
        self.rescale_type.clone()
    }
    fn contrast_bolus_agent(&self) -> Option<String> {
        self.contrast_bolus_agent.clone()
    }
    fn photometric_interpretation(&self) -> Option<String> {
        self.photometric_interpretation.clone()
    }
    fn window_center(&self) -> Option<Vec<f64>> {
        self.window_center.clone()
    }
    fn window_width(&self) -> Option<Vec<f64>> {
        self.window_width.clone()
    }
    fn voi_lut_function(&self) -> Option<String> {
        self.voi_lut_function.clone()
    }
    fn modality_lut(&self) -> Option<LutItem> {
        self.modality_lut.clone()
    }
    fn voi_lut(&self) -> Option<LutItem> {
        self.voi_lut.clone()
    }
    fn view_position(&self) -> Option<String> {
        self.view_position.clone()
    }
    fn series_description(&self) -> Option<String> {
        self.series_description.clone()
    }
    fn slice_thickness(&self) -> Option<f64> {
        self.slice_thickness
    }
    fn patient_position(&self) -> Option<String> {
        self.patient_position.clone()
    }
    fn patient_id(&self) -> Option<String> {
        self.patient_id.clone()
    }
    fn study_instance_uid(&self) -> Option<String> {
        self.study_instance_uid.clone()
    }
    fn series_instance_uid(&self) -> Option<String> {
        self.series_instance_uid.clone()
    }
    fn pixel_array(&self) -> Option<PixelArray> {
        self.pixels.clone()
    }
}
