//! [`SliceRecord`] for DICOM objects read with the `dicom` crate.

use dicom::core::{Tag, VR};
use dicom::object::{FileDicomObject, InMemDicomObject};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use dicom_dictionary_std::tags;
use ndarray::Axis;

use crate::pixel::{PixelArray, SampleType};
use crate::record::{LutField, LutItem, SliceRecord};

fn string(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    let value = obj.element(tag).ok()?.to_str().ok()?;
    let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!value.is_empty()).then(|| value.to_string())
}

fn int(obj: &InMemDicomObject, tag: Tag) -> Option<i64> {
    obj.element(tag).ok()?.to_int::<i64>().ok()
}

fn uint<T: TryFrom<i64>>(obj: &InMemDicomObject, tag: Tag) -> Option<T> {
    T::try_from(int(obj, tag)?).ok()
}

fn float(obj: &InMemDicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

fn floats(obj: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    let values = obj.element(tag).ok()?.to_multi_float64().ok()?;
    (!values.is_empty()).then_some(values)
}

fn lut_field(obj: &InMemDicomObject, tag: Tag) -> Option<LutField> {
    let element = obj.element(tag).ok()?;
    match element.vr() {
        VR::OB | VR::OW | VR::UN => Some(LutField::Bytes(element.to_bytes().ok()?.into_owned())),
        _ => Some(LutField::Values(element.to_multi_int::<i64>().ok()?)),
    }
}

/// First item of a LUT sequence.
fn lut_item(obj: &InMemDicomObject, sequence: Tag, lut_type: Tag) -> Option<LutItem> {
    let item = obj.element(sequence).ok()?.items()?.first()?;
    Some(LutItem {
        descriptor: lut_field(item, tags::LUT_DESCRIPTOR)?,
        data: lut_field(item, tags::LUT_DATA)?,
        lut_type: string(item, lut_type),
    })
}

/// Decode the first frame as stored, without any LUT applied.
fn decode_first_frame(obj: &FileDicomObject<InMemDicomObject>) -> Option<PixelArray> {
    let pixel_data = obj
        .decode_pixel_data()
        .map_err(|e| tracing::debug!("could not decode pixel data: {e}"))
        .ok()?;
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::None)
        .with_voi_lut(VoiLutOption::Identity);
    let frames = pixel_data
        .to_ndarray_with_options::<i32>(&options)
        .map_err(|e| tracing::debug!("could not convert pixel data: {e}"))
        .ok()?;
    // (frames, rows, columns, samples)
    let frame = frames.index_axis_move(Axis(0), 0);
    let frame = if frame.len_of(Axis(2)) == 1 {
        frame.index_axis_move(Axis(2), 0).into_dyn()
    } else {
        frame.into_dyn()
    };

    let bits_allocated = obj.bits_allocated().unwrap_or(16);
    let signed = obj.pixel_representation() == Some(1);
    Some(PixelArray::new(
        frame.mapv(f64::from),
        SampleType::from_bits(bits_allocated, signed),
    ))
}

impl SliceRecord for FileDicomObject<InMemDicomObject> {
    fn instance_number(&self) -> Option<i64> {
        int(self, tags::INSTANCE_NUMBER)
    }

    fn modality(&self) -> Option<String> {
        string(self, tags::MODALITY)
    }

    fn image_orientation(&self) -> Option<[f64; 6]> {
        floats(self, tags::IMAGE_ORIENTATION_PATIENT)?.try_into().ok()
    }

    fn image_position(&self) -> Option<[f64; 3]> {
        floats(self, tags::IMAGE_POSITION_PATIENT)?.try_into().ok()
    }

    fn pixel_spacing(&self) -> Option<[f64; 2]> {
        floats(self, tags::PIXEL_SPACING)?.try_into().ok()
    }

    fn rows(&self) -> Option<u32> {
        uint(self, tags::ROWS)
    }

    fn columns(&self) -> Option<u32> {
        uint(self, tags::COLUMNS)
    }

    fn bits_allocated(&self) -> Option<u16> {
        uint(self, tags::BITS_ALLOCATED)
    }

    fn bits_stored(&self) -> Option<u16> {
        uint(self, tags::BITS_STORED)
    }

    fn pixel_representation(&self) -> Option<u16> {
        uint(self, tags::PIXEL_REPRESENTATION)
    }

    fn rescale_slope(&self) -> Option<f64> {
        float(self, tags::RESCALE_SLOPE)
    }

    fn rescale_intercept(&self) -> Option<f64> {
        float(self, tags::RESCALE_INTERCEPT)
    }

    fn rescale_type(&self) -> Option<String> {
        string(self, tags::RESCALE_TYPE)
    }

    fn contrast_bolus_agent(&self) -> Option<String> {
        string(self, tags::CONTRAST_BOLUS_AGENT)
    }

    fn photometric_interpretation(&self) -> Option<String> {
        string(self, tags::PHOTOMETRIC_INTERPRETATION)
    }

    fn window_center(&self) -> Option<Vec<f64>> {
        floats(self, tags::WINDOW_CENTER)
    }

    fn window_width(&self) -> Option<Vec<f64>> {
        floats(self, tags::WINDOW_WIDTH)
    }

    fn voi_lut_function(&self) -> Option<String> {
        string(self, tags::VOILUT_FUNCTION)
    }

    fn modality_lut(&self) -> Option<LutItem> {
        lut_item(self, tags::MODALITY_LUT_SEQUENCE, tags::MODALITY_LUT_TYPE)
    }

    fn voi_lut(&self) -> Option<LutItem> {
        lut_item(self, tags::VOILUT_SEQUENCE, tags::LUT_EXPLANATION)
    }

    fn view_position(&self) -> Option<String> {
        string(self, tags::VIEW_POSITION)
    }

    fn series_description(&self) -> Option<String> {
        string(self, tags::SERIES_DESCRIPTION)
    }

    fn slice_thickness(&self) -> Option<f64> {
        float(self, tags::SLICE_THICKNESS)
    }

    fn patient_position(&self) -> Option<String> {
        string(self, tags::PATIENT_POSITION)
    }

    fn patient_id(&self) -> Option<String> {
        string(self, tags::PATIENT_ID)
    }

    fn study_instance_uid(&self) -> Option<String> {
        string(self, tags::STUDY_INSTANCE_UID)
    }

    fn series_instance_uid(&self) -> Option<String> {
        string(self, tags::SERIES_INSTANCE_UID)
    }

    fn pixel_array(&self) -> Option<PixelArray> {
        decode_first_frame(self)
    }
}
