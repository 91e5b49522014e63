use std::collections::BTreeSet;

use dicom_trans::{
    Chirality, Interpolation, MemRecord, NoStorage, Orientation, PixelArray, ReconstructionError,
    SampleType, SeriesLike, VolumeLoader, VolumeOptions, Window, reconstruct,
};
use ndarray::Array2;
use rstest::rstest;

fn slice(index: i64, orientation: [f64; 6], position: [f64; 3]) -> MemRecord {
    MemRecord::new()
        .with_instance_number(index)
        .with_modality("CT")
        .with_geometry(orientation, position)
        .with_size(8, 8, [0.5, 0.5])
        .with_rescale(1., -1024.)
        .with_photometric_interpretation("MONOCHROME2")
        .with_pixels(PixelArray::new(
            Array2::from_shape_fn((8, 8), |(y, x)| (index * 100 + (y * 8 + x) as i64) as f64)
                .into_dyn(),
            SampleType::U16,
        ))
}

fn stack(orientation: [f64; 6], step: [f64; 3], count: i64) -> Vec<(String, MemRecord)> {
    (1..=count)
        .map(|i| {
            let k = (i - 1) as f64;
            let position = [step[0] * k, step[1] * k, step[2] * k];
            (format!("slice{i}.dcm"), slice(i, orientation, position))
        })
        .collect()
}

#[rstest]
#[case([1., 0., 0., 0., 1., 0.], [0., 0., 1.25], SeriesLike::Axial, Chirality::Positive)]
#[case([1., 0., 0., 0., 1., 0.], [0., 0., -1.25], SeriesLike::Axial, Chirality::Negative)]
#[case([1., 0., 0., 0., 0., -1.], [0., 1.25, 0.], SeriesLike::Coronal, Chirality::Positive)]
#[case([0., 1., 0., 0., 0., -1.], [-1.25, 0., 0.], SeriesLike::Sagittal, Chirality::Positive)]
#[case([0.7071, 0.7071, 0., 0., 0., -1.], [-0.8839, 0.8839, 0.], SeriesLike::Other, Chirality::Positive)]
fn classifies_plane_and_direction(
    #[case] orientation: [f64; 6],
    #[case] step: [f64; 3],
    #[case] series_like: SeriesLike,
    #[case] chirality: Chirality,
) {
    let reconstruction = reconstruct(stack(orientation, step, 4), None).unwrap();
    assert_eq!(reconstruction.index_list, vec![1, 2, 3, 4]);
    assert_eq!(reconstruction.series_like, Some(series_like));
    assert_eq!(reconstruction.chirality, Some(chirality));
    assert_eq!(reconstruction.spacing, Some(BTreeSet::from([1250])));
}

#[test]
fn failed_series_lists_every_problem() {
    let mut records = stack([1., 0., 0., 0., 1., 0.], [0., 0., 1.], 5);
    records.remove(2);
    records[0].1.image_position = Some([3., 0., 0.]);
    let error = reconstruct(records, None).unwrap_err();
    assert_eq!(
        error.messages(),
        vec!["1 and 2 are not aligned", "index jump 2 -> 4"]
    );
    assert!(matches!(error, ReconstructionError::SliceSequence { .. }));
}

#[test]
fn series_to_volume_to_image() {
    let reconstruction = reconstruct(stack([1., 0., 0., 0., 1., 0.], [0., 0., 1.], 4), None).unwrap();
    let options = VolumeOptions::new()
        .with_window(Window::explicit(-700., 800.))
        .with_resize(4, 4)
        .with_interpolation(Interpolation::Nearest);
    let volume = VolumeLoader::build_volume(&reconstruction, &NoStorage, &options).unwrap();

    assert_eq!(volume.dim(), (4, 4, 4));
    assert_eq!(volume.spacing, (1., 1., 1.));
    for z in 1..4 {
        assert!(volume.data[[z, 0, 0]] > volume.data[[z - 1, 0, 0]]);
    }

    let image = volume
        .get_image_from_axis(2, Orientation::Coronal, Some(Interpolation::Bilinear))
        .unwrap();
    assert_eq!(image.dimensions(), (4, 4));
    assert!(
        volume
            .get_image_from_axis(4, Orientation::Axial, None)
            .is_none()
    );
}
