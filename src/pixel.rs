use ndarray::{Array1, ArrayD};

/// Numeric type of the samples an image was stored with.
///
/// Every transform computes in `f64`; the sample type is what the result is
/// cast back to once it has been clamped, so that e.g. an unsigned 16-bit
/// image windowed into 8 bits keeps integral values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    I64,
    F32,
    #[default]
    F64,
}

impl SampleType {
    /// Sample type implied by _Bits Allocated_ and _Pixel Representation_.
    pub fn from_bits(bits_allocated: u16, signed: bool) -> Self {
        match (bits_allocated, signed) {
            (0..=8, false) => SampleType::U8,
            (0..=8, true) => SampleType::I8,
            (9..=16, false) => SampleType::U16,
            (9..=16, true) => SampleType::I16,
            (17..=32, false) => SampleType::U32,
            (17..=32, true) => SampleType::I32,
            _ => SampleType::I64,
        }
    }

    fn bounds(&self) -> (f64, f64) {
        match self {
            SampleType::U8 => (u8::MIN as f64, u8::MAX as f64),
            SampleType::I8 => (i8::MIN as f64, i8::MAX as f64),
            SampleType::U16 => (u16::MIN as f64, u16::MAX as f64),
            SampleType::I16 => (i16::MIN as f64, i16::MAX as f64),
            SampleType::U32 => (u32::MIN as f64, u32::MAX as f64),
            SampleType::I32 => (i32::MIN as f64, i32::MAX as f64),
            SampleType::I64 => (i64::MIN as f64, i64::MAX as f64),
            SampleType::F32 => (f32::MIN as f64, f32::MAX as f64),
            SampleType::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Cast a computed value back into this sample type.
    ///
    /// Integer types truncate toward zero and saturate at their range.
    #[inline]
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            SampleType::F64 => value,
            SampleType::F32 => value as f32 as f64,
            integer => {
                let (min, max) = integer.bounds();
                value.trunc().clamp(min, max)
            }
        }
    }
}

/// An image held as `f64` samples together with the type it was stored as.
///
/// Grayscale images are `(rows, columns)`; colour images carry the samples
/// on the last axis, `(rows, columns, 3)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelArray {
    data: ArrayD<f64>,
    sample_type: SampleType,
}

impl PixelArray {
    pub fn new(data: ArrayD<f64>, sample_type: SampleType) -> Self {
        Self { data, sample_type }
    }

    /// Build a one-dimensional array, mostly useful for small examples.
    pub fn from_vec(values: Vec<f64>, sample_type: SampleType) -> Self {
        Self::new(Array1::from_vec(values).into_dyn(), sample_type)
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Apply `f` to every sample in floating point, then cast the results
    /// back into the current sample type.
    pub fn map_cast(mut self, f: impl Fn(f64) -> f64) -> Self {
        let sample_type = self.sample_type;
        self.data.mapv_inplace(|v| sample_type.cast(f(v)));
        self
    }

    /// Apply `f` to every sample and retag the result as `sample_type`
    /// without clamping.
    pub fn map_into(self, sample_type: SampleType, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.mapv(f),
            sample_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PixelArray, SampleType};

    #[test]
    fn cast_truncates_and_saturates_integers() {
        assert_eq!(SampleType::U8.cast(254.9), 254.0);
        assert_eq!(SampleType::U8.cast(300.0), 255.0);
        assert_eq!(SampleType::U8.cast(-3.0), 0.0);
        assert_eq!(SampleType::I16.cast(-1.7), -1.0);
        assert_eq!(SampleType::F64.cast(-1.7), -1.7);
    }

    #[test]
    fn sample_type_from_bits() {
        assert_eq!(SampleType::from_bits(8, false), SampleType::U8);
        assert_eq!(SampleType::from_bits(16, true), SampleType::I16);
        assert_eq!(SampleType::from_bits(12, false), SampleType::U16);
        assert_eq!(SampleType::from_bits(32, true), SampleType::I32);
    }

    #[test]
    fn map_cast_keeps_sample_type() {
        let image = PixelArray::from_vec(vec![1.0, 2.0, 3.0], SampleType::U8);
        let image = image.map_cast(|v| v * 1.5);
        assert_eq!(image.sample_type(), SampleType::U8);
        assert_eq!(image.data().as_slice().unwrap(), &[1.0, 3.0, 4.0]);
    }
}
