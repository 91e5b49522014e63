use std::path::PathBuf;

use dicom_trans::{
    enums::{Interpolation, Orientation, Parallelism},
    scan::scan_and_reconstruct,
    volume_loader::{FileStorage, VolumeLoader, VolumeOptions},
    window::Window,
};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("should have set the global tracing subscriber");

    let directory = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("dicom"), PathBuf::from);
    let series = scan_and_reconstruct(&directory, Parallelism::Rayon)
        .expect("should have scanned directory");

    let options = VolumeOptions::new().with_window(Window::Default);
    for (key, reconstruction) in series {
        let reconstruction = match reconstruction {
            Ok(reconstruction) => reconstruction,
            Err(e) => {
                error!("{key}: {e}");
                continue;
            }
        };
        info!("{key}: {}", reconstruction.info());

        let volume = match VolumeLoader::build_volume(&reconstruction, &FileStorage, &options) {
            Ok(volume) => volume,
            Err(e) => {
                error!("{key}: {e}");
                continue;
            }
        };
        let Some(image) = volume.get_image_from_axis(
            volume.dim().0 / 2,
            Orientation::Axial,
            Some(Interpolation::Bilinear),
        ) else {
            continue;
        };
        let output = format!("{}.png", key.series_instance_uid);
        match image.save(&output) {
            Ok(()) => info!("saved {output}"),
            Err(e) => error!("could not save {output}: {e}"),
        }
    }
}
