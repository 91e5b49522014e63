//! Finding the series in a directory tree and reconstructing each of them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use dicom::object::{FileDicomObject, InMemDicomObject, OpenFileOptions};
use dicom_dictionary_std::tags;
use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use crate::enums::Parallelism;
use crate::reconstruction::{Reconstruction, ReconstructionError, reconstruct};
use crate::record::SliceRecord;

/// Identifies a series across patients and studies. Missing values are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey {
    pub patient_id: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
}

impl InstanceKey {
    /// `None` for records without a _Series Instance UID_.
    pub fn of(record: &dyn SliceRecord) -> Option<Self> {
        Some(Self {
            patient_id: record.patient_id().unwrap_or_default(),
            study_instance_uid: record.study_instance_uid().unwrap_or_default(),
            series_instance_uid: record.series_instance_uid()?,
        })
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.patient_id, self.study_instance_uid, self.series_instance_uid
        )
    }
}

/// Records of each series, keyed by the file they were read from.
pub type SeriesMap<R> = BTreeMap<InstanceKey, Vec<(PathBuf, R)>>;

/// Reconstruction outcome of each series.
pub type ReconstructionMap<R> =
    BTreeMap<InstanceKey, Result<Reconstruction<PathBuf, R>, ReconstructionError>>;

pub type DicomFile = FileDicomObject<InMemDicomObject>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Group records by series. Records without a series UID are skipped.
pub fn group_records<R: SliceRecord>(records: impl IntoIterator<Item = (PathBuf, R)>) -> SeriesMap<R> {
    let mut groups: SeriesMap<R> = BTreeMap::new();
    for (path, record) in records {
        let Some(key) = InstanceKey::of(&record) else {
            tracing::warn!("{}: no SeriesInstanceUID, skipped", path.display());
            continue;
        };
        groups.entry(key).or_insert_with(Vec::new).push((path, record));
    }
    groups
}

/// Read the header of every DICOM file below `path` and group them by series.
///
/// Pixel data is not read; build volumes from the result with
/// [`FileStorage`](crate::volume_loader::FileStorage). Files that cannot be
/// read are skipped.
pub fn scan_directory(path: impl AsRef<Path>) -> Result<SeriesMap<DicomFile>, ScanError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(ScanError::NotADirectory(path.to_path_buf()));
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::warn!("skipping entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file = entry.path();
        match OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(file)
        {
            Ok(object) => records.push((file.to_path_buf(), object)),
            Err(e) => tracing::warn!("cannot read {}: {e}", file.display()),
        }
    }
    tracing::info!("read {} DICOM file(s) from {}", records.len(), path.display());

    Ok(group_records(records))
}

/// Reconstruct every series. A failing series does not affect the others.
pub fn reconstruct_series_map<R>(groups: SeriesMap<R>, parallelism: Parallelism) -> ReconstructionMap<R>
where
    R: SliceRecord + Send,
{
    let reconstruct_one = |(key, records): (InstanceKey, Vec<(PathBuf, R)>)| {
        let result = reconstruct(records, None);
        if let Err(e) = &result {
            tracing::warn!("series {key}: {}", e.messages().join("; "));
        }
        (key, result)
    };

    match parallelism {
        Parallelism::Sequential => groups.into_iter().map(reconstruct_one).collect(),
        Parallelism::Rayon => groups.into_par_iter().map(reconstruct_one).collect(),
    }
}

/// [`scan_directory`] followed by [`reconstruct_series_map`].
pub fn scan_and_reconstruct(
    path: impl AsRef<Path>,
    parallelism: Parallelism,
) -> Result<ReconstructionMap<DicomFile>, ScanError> {
    let groups = scan_directory(path)?;
    Ok(reconstruct_series_map(groups, parallelism))
}
