//! Ordering and geometric validation of the slices of one series.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::diagnostics::{Diagnostics, Warning};
use crate::enums::{Chirality, SeriesLike};
use crate::record::SliceRecord;

/// Below this the first two orientations are treated as degenerate.
const CROSS_TERM_THRESHOLD: f64 = 0.1;
/// Displacements shorter than this (mm) are treated as coincident slices.
const ZERO_SPACING: f64 = 1e-4;
/// Minimum |cos| between the displacement and the slice normal.
const ALIGNMENT_THRESHOLD: f64 = 0.99;
/// Maximum |cos| between row/column and a plane normal to call it that plane.
const PLANE_THRESHOLD: f64 = 0.1;

const PLANES: [(SeriesLike, [f64; 3]); 3] = [
    (SeriesLike::Axial, [0., 0., 1.]),
    (SeriesLike::Coronal, [0., 1., 0.]),
    (SeriesLike::Sagittal, [1., 0., 0.]),
];

/// A problem between two consecutive slices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceIssue {
    IndexJump { from: i64, to: i64 },
    NotAligned { from: i64, to: i64 },
}

impl fmt::Display for SequenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceIssue::IndexJump { from, to } => write!(f, "index jump {from} -> {to}"),
            SequenceIssue::NotAligned { from, to } => write!(f, "{from} and {to} are not aligned"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReconstructionError {
    #[error("No instance was found")]
    NoInstance,

    #[error("Multiple modalities were found: {}", .0.join(", "))]
    MultipleModality(Vec<String>),

    #[error("Modality \"{modality}\": multiple instances were found")]
    MultipleInstances { modality: String },

    #[error("Cannot be reconstructed: {0} CT image(s), at least 2 needed")]
    TooFewInstances(usize),

    #[error("No reconstruction method for modality \"{0}\"")]
    NotImplemented(String),

    #[error("Instance {index}: {attribute} not found")]
    MissingAttribute { index: i64, attribute: &'static str },

    #[error("Rows of images mismatch")]
    RowsMismatch,

    #[error("Columns of images mismatch")]
    ColumnsMismatch,

    #[error("PixelSpacing of images mismatch")]
    PixelSpacingMismatch,

    #[error("{}", join_lines(.issues))]
    SliceSequence { issues: Vec<SequenceIssue> },

    #[error("Direction (chirality) of images mismatch")]
    ChiralityMismatch,
}

fn join_lines(issues: &[SequenceIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl ReconstructionError {
    /// The human readable problems behind this error, one per entry.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ReconstructionError::SliceSequence { issues } => {
                issues.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

/// Per-instance details kept next to a reconstruction.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceInfo {
    pub bits_stored: Option<u16>,
    /// Rounded to 1e-4 mm.
    pub image_position: Option<[f64; 3]>,
}

/// An ordered, validated series.
///
/// `K` is whatever identifies a slice to the caller, usually a file path.
#[derive(Debug)]
pub struct Reconstruction<K, R> {
    pub modality: String,
    /// Instance numbers in ascending order.
    pub index_list: Vec<i64>,
    pub index_map: BTreeMap<i64, K>,
    pub records: BTreeMap<i64, R>,
    pub series_like: Option<SeriesLike>,
    pub chirality: Option<Chirality>,
    /// Distinct inter-slice spacings in micrometres. `None` for projections.
    pub spacing: Option<BTreeSet<i64>>,
    pub use_contrast: bool,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    /// Spacing between columns (mm).
    pub spacing_i: f64,
    /// Spacing between rows (mm).
    pub spacing_j: f64,
    pub description: Option<String>,
    pub slice_thickness: Option<f64>,
    pub patient_position: Option<String>,
    /// Rounded to 1e-4.
    pub orientation: Option<[f64; 6]>,
    /// Image position of each instance, rounded to 1e-4 mm.
    pub positions: BTreeMap<i64, [f64; 3]>,
    pub diagnostics: Diagnostics,
}

impl<K, R: SliceRecord> Reconstruction<K, R> {
    /// Number of slices in the series.
    pub fn len(&self) -> usize {
        self.index_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_list.is_empty()
    }

    /// Slices in order as (instance number, key, record).
    pub fn iter(&self) -> impl Iterator<Item = (i64, &K, &R)> {
        self.index_list
            .iter()
            .filter_map(|i| Some((*i, self.index_map.get(i)?, self.records.get(i)?)))
    }

    pub fn instance_info(&self, index: i64) -> Option<InstanceInfo> {
        let record = self.records.get(&index)?;
        Some(InstanceInfo {
            bits_stored: record.bits_stored(),
            image_position: record.image_position().map(|p| p.map(round4)),
        })
    }

    /// The smallest distance between two consecutive slices (mm).
    pub fn slice_spacing(&self) -> Option<f64> {
        self.spacing
            .as_ref()?
            .first()
            .map(|&um| um as f64 / 1000.)
    }

    pub fn info(&self) -> SeriesInfo {
        SeriesInfo {
            modality: self.modality.clone(),
            slices: self.len(),
            series_like: self.series_like.clone(),
            chirality: self.chirality,
            slice_spacing: self.slice_spacing(),
            use_contrast: self.use_contrast,
            rows: self.rows,
            columns: self.columns,
            description: self.description.clone(),
        }
    }
}

/// Summary of a reconstruction, for listings.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesInfo {
    pub modality: String,
    pub slices: usize,
    pub series_like: Option<SeriesLike>,
    pub chirality: Option<Chirality>,
    pub slice_spacing: Option<f64>,
    pub use_contrast: bool,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub description: Option<String>,
}

impl fmt::Display for SeriesInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.modality, self.slices)?;
        if let (Some(rows), Some(columns)) = (self.rows, self.columns) {
            write!(f, " {rows}x{columns}")?;
        }
        if let Some(series_like) = &self.series_like {
            write!(f, " {series_like}")?;
        }
        if let Some(spacing) = self.slice_spacing {
            write!(f, " spacing {spacing}mm")?;
        }
        if self.use_contrast {
            write!(f, " contrast")?;
        }
        if let Some(description) = &self.description {
            write!(f, " \"{description}\"")?;
        }
        Ok(())
    }
}

fn round4(v: f64) -> f64 {
    (v * 1e4).round() / 1e4
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cross(a: &[f64], b: &[f64]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Order `records` by instance number and validate their geometry.
///
/// Records without an instance number are dropped. `modality_override`
/// replaces the modality of the records and skips the agreement check.
///
/// # Errors
///
/// Returns an error if the records do not form a single consistent series
/// of a supported modality (CT, CR or DX).
pub fn reconstruct<K, R, I>(
    records: I,
    modality_override: Option<&str>,
) -> Result<Reconstruction<K, R>, ReconstructionError>
where
    I: IntoIterator<Item = (K, R)>,
    R: SliceRecord,
{
    let mut diagnostics = Diagnostics::new();
    let mut modalities = BTreeSet::new();
    let mut entries: BTreeMap<i64, (K, R)> = BTreeMap::new();
    for (key, record) in records {
        modalities.insert(record.modality().map(|m| m.trim().to_string()));
        let Some(index) = record.instance_number() else {
            continue;
        };
        if entries.insert(index, (key, record)).is_some() {
            diagnostics.push(Warning::DuplicateInstance { index });
        }
    }
    if modalities.is_empty() {
        return Err(ReconstructionError::NoInstance);
    }

    let modality = match modality_override {
        Some(modality) => Some(modality.trim().to_string()),
        None if modalities.len() > 1 => {
            return Err(ReconstructionError::MultipleModality(
                modalities
                    .into_iter()
                    .map(|m| m.unwrap_or_else(|| "None".to_string()))
                    .collect(),
            ));
        }
        None => modalities.into_iter().next().flatten(),
    };

    let (series_like, chirality, spacing, orientation) = match modality.as_deref() {
        Some(m @ ("CR" | "DX")) => {
            if entries.is_empty() {
                return Err(ReconstructionError::NoInstance);
            }
            if entries.len() > 1 {
                return Err(ReconstructionError::MultipleInstances {
                    modality: m.to_string(),
                });
            }
            let series_like = if m == "CR" {
                entries
                    .values()
                    .next()
                    .and_then(|(_, r)| r.view_position())
                    .map(SeriesLike::ViewPosition)
            } else {
                None
            };
            (series_like, None, None, None)
        }
        Some("CT") => {
            if entries.len() < 2 {
                return Err(ReconstructionError::TooFewInstances(entries.len()));
            }
            let geometry = reconstruct_ct(&mut entries, &mut diagnostics)?;
            (
                Some(geometry.series_like),
                geometry.chirality,
                Some(geometry.spacing),
                Some(geometry.orientation),
            )
        }
        other => {
            return Err(ReconstructionError::NotImplemented(
                other.unwrap_or("None").to_string(),
            ));
        }
    };
    let modality = modality.unwrap_or_default();

    let index_list: Vec<i64> = entries.keys().copied().collect();
    let mut index_map = BTreeMap::new();
    let mut records = BTreeMap::new();
    for (index, (key, record)) in entries {
        index_map.insert(index, key);
        records.insert(index, record);
    }

    let first = index_list
        .first()
        .and_then(|i| records.get(i))
        .ok_or(ReconstructionError::NoInstance)?;
    let use_contrast = first
        .contrast_bolus_agent()
        .is_some_and(|agent| !agent.trim().is_empty());
    let pixel_spacing = first.pixel_spacing().unwrap_or([1., 1.]);
    let rows = first.rows();
    let columns = first.columns();
    let description = first.series_description();
    let slice_thickness = first.slice_thickness();
    let patient_position = first.patient_position();

    let positions = records
        .iter()
        .filter_map(|(i, r)| Some((*i, r.image_position()?.map(round4))))
        .collect();

    tracing::debug!(
        "reconstructed {modality} series of {} instance(s)",
        index_list.len()
    );

    Ok(Reconstruction {
        modality,
        index_list,
        index_map,
        records,
        series_like,
        chirality,
        spacing,
        use_contrast,
        rows,
        columns,
        spacing_i: pixel_spacing[1],
        spacing_j: pixel_spacing[0],
        description,
        slice_thickness,
        patient_position,
        orientation,
        positions,
        diagnostics,
    })
}

struct CtGeometry {
    series_like: SeriesLike,
    chirality: Option<Chirality>,
    spacing: BTreeSet<i64>,
    orientation: [f64; 6],
}

fn orientation_of<R: SliceRecord>(index: i64, record: &R) -> Result<[f64; 6], ReconstructionError> {
    record
        .image_orientation()
        .ok_or(ReconstructionError::MissingAttribute {
            index,
            attribute: "ImageOrientationPatient",
        })
}

fn position_of<R: SliceRecord>(index: i64, record: &R) -> Result<[f64; 3], ReconstructionError> {
    record
        .image_position()
        .ok_or(ReconstructionError::MissingAttribute {
            index,
            attribute: "ImagePositionPatient",
        })
}

/// All values of `attribute` across `entries` must be present and equal.
fn check_uniform<K, R, T: Ord>(
    entries: &BTreeMap<i64, (K, R)>,
    attribute: &'static str,
    get: impl Fn(&R) -> Option<T>,
    mismatch: ReconstructionError,
) -> Result<(), ReconstructionError> {
    let mut values = BTreeSet::new();
    for (index, (_, record)) in entries {
        let value = get(record).ok_or(ReconstructionError::MissingAttribute {
            index: *index,
            attribute,
        })?;
        values.insert(value);
    }
    if values.len() > 1 {
        return Err(mismatch);
    }
    Ok(())
}

fn reconstruct_ct<K, R: SliceRecord>(
    entries: &mut BTreeMap<i64, (K, R)>,
    diagnostics: &mut Diagnostics,
) -> Result<CtGeometry, ReconstructionError> {
    let mut indices = entries.keys().copied();
    let (Some(first), Some(second)) = (indices.next(), indices.next()) else {
        return Err(ReconstructionError::TooFewInstances(entries.len()));
    };
    let o1 = orientation_of(first, &entries[&first].1)?;
    let o2 = orientation_of(second, &entries[&second].1)?;
    let (r1, c1) = o1.split_at(3);
    let (r2, c2) = o2.split_at(3);
    let cross_term = dot(r1, r2) * dot(c1, c2) - dot(r1, c2) * dot(c1, r2);
    if cross_term.abs() < CROSS_TERM_THRESHOLD {
        tracing::debug!("discarding instance {first}: orientation differs from the next one");
        entries.remove(&first);
    }

    check_uniform(
        entries,
        "Columns",
        |r| r.columns(),
        ReconstructionError::ColumnsMismatch,
    )?;
    check_uniform(entries, "Rows", |r| r.rows(), ReconstructionError::RowsMismatch)?;
    check_uniform(
        entries,
        "PixelSpacing",
        |r| {
            r.pixel_spacing()
                .map(|s| s.map(|v| (v / 1e-3).round() as i64))
        },
        ReconstructionError::PixelSpacingMismatch,
    )?;

    let mut slices = Vec::with_capacity(entries.len());
    for (index, (_, record)) in entries.iter() {
        slices.push((
            *index,
            orientation_of(*index, record)?,
            position_of(*index, record)?,
        ));
    }

    let mut issues = Vec::new();
    let mut signs = BTreeSet::new();
    let mut spacing = BTreeSet::new();
    for pair in slices.windows(2) {
        let (from, orientation, p0) = &pair[0];
        let (to, _, p1) = &pair[1];
        let (from, to) = (*from, *to);
        if to - from != 1 {
            issues.push(SequenceIssue::IndexJump { from, to });
            continue;
        }
        let displacement = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
        let distance = dot(&displacement, &displacement).sqrt();
        if distance < ZERO_SPACING {
            diagnostics.push(Warning::ZeroSpacing { from, to });
            continue;
        }
        let (row, column) = orientation.split_at(3);
        let cosine = dot(&displacement, &cross(row, column)) / distance;
        if cosine.abs() < ALIGNMENT_THRESHOLD {
            issues.push(SequenceIssue::NotAligned { from, to });
            continue;
        }
        signs.insert(cosine > 0.);
        spacing.insert((distance * 1e3).round() as i64);
    }
    if !issues.is_empty() {
        return Err(ReconstructionError::SliceSequence { issues });
    }

    let chirality = match signs.len() {
        0 => None,
        1 if signs.contains(&true) => Some(Chirality::Positive),
        1 => Some(Chirality::Negative),
        _ => return Err(ReconstructionError::ChiralityMismatch),
    };

    let orientation = slices
        .first()
        .map(|(_, o, _)| *o)
        .ok_or(ReconstructionError::NoInstance)?;
    let (row, column) = orientation.split_at(3);
    let series_like = PLANES
        .iter()
        .find(|(_, normal)| {
            dot(row, normal).abs() < PLANE_THRESHOLD && dot(column, normal).abs() < PLANE_THRESHOLD
        })
        .map_or(SeriesLike::Other, |(plane, _)| plane.clone());

    Ok(CtGeometry {
        series_like,
        chirality,
        spacing,
        orientation: orientation.map(round4),
    })
}
