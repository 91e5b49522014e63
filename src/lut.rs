use crate::pipeline::TransformError;
use crate::pixel::{PixelArray, SampleType};
use crate::record::{LutField, LutItem};

/// A decoded lookup table.
///
/// Inputs below `first_mapped` map to the first entry, inputs at or past
/// `first_mapped + entries - 1` to the last.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupTable {
    entries: usize,
    first_mapped: i64,
    bits: u16,
    data: Vec<f64>,
}

impl LookupTable {
    /// Decode a LUT sequence item.
    ///
    /// A byte-packed descriptor is read as three 16-bit words. The entry
    /// count and the bit width are always unsigned; the first mapped value
    /// is read as signed when `signed_descriptor` is set. Byte-packed data is
    /// read with the entry width given by the descriptor.
    pub fn decode(item: &LutItem, signed_descriptor: bool) -> Result<Self, TransformError> {
        let descriptor = decode_descriptor(&item.descriptor, signed_descriptor)?;
        let [raw_entries, first_mapped, bits] = descriptor;
        if bits != 8 && bits != 16 {
            return Err(TransformError::LutBitWidth(bits));
        }
        // An entry count of 0 stands for 2^16 entries.
        let entries = if raw_entries == 0 {
            1 << 16
        } else {
            raw_entries as usize
        };
        let data: Vec<f64> = match &item.data {
            LutField::Values(values) => values.iter().map(|&v| v as f64).collect(),
            LutField::Bytes(bytes) if bits == 8 => bytes.iter().map(|&b| b as f64).collect(),
            LutField::Bytes(bytes) => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f64)
                .collect(),
        };
        if data.len() < entries {
            return Err(TransformError::LutTooShort {
                expected: entries,
                found: data.len(),
            });
        }
        Ok(Self {
            entries,
            first_mapped,
            bits: bits as u16,
            data,
        })
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn first_mapped(&self) -> i64 {
        self.first_mapped
    }

    /// Sample type of the raw table entries.
    pub fn entry_type(&self) -> SampleType {
        if self.bits == 8 {
            SampleType::U8
        } else {
            SampleType::U16
        }
    }

    #[inline]
    pub fn lookup(&self, value: f64) -> f64 {
        let offset = value - self.first_mapped as f64;
        let index = if offset <= 0. {
            0
        } else if offset >= self.entries as f64 {
            self.entries - 1
        } else {
            offset as usize
        };
        self.data[index]
    }

    /// Map every sample of `image` through the table, multiplying the table
    /// outputs by `scale`.
    pub fn apply(&self, image: PixelArray, scale: f64, sample_type: SampleType) -> PixelArray {
        image.map_into(sample_type, |v| self.lookup(v) * scale)
    }
}

fn decode_descriptor(field: &LutField, signed: bool) -> Result<[i64; 3], TransformError> {
    let values: Vec<i64> = match field {
        // the VR may disagree with the signedness of each word
        LutField::Values(values) => values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let word = v & 0xffff;
                if i == 1 && signed {
                    word as u16 as i16 as i64
                } else {
                    word
                }
            })
            .collect(),
        LutField::Bytes(bytes) => bytes
            .chunks_exact(2)
            .enumerate()
            .map(|(i, c)| {
                let word = [c[0], c[1]];
                if i == 1 && signed {
                    i16::from_le_bytes(word) as i64
                } else {
                    u16::from_le_bytes(word) as i64
                }
            })
            .collect(),
    };
    match values.as_slice() {
        [entries, first, bits, ..] => Ok([*entries, *first, *bits]),
        _ => Err(TransformError::LutDescriptor(values.len())),
    }
}
