use std::fmt;

/// Axes of a [`Volume`](crate::volume::Volume), named after the plane a
/// slice along them shows for an axial acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

/// How slices are resampled when a volume is built with a target size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Bilinear,
    #[default]
    Nearest,
}

/// What the VOI stage does with records that carry no window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnclassifiedVoi {
    /// Leave them unclassified: no VOI transform is applied.
    #[default]
    Identity,
    /// Treat them as `LINEAR`, windowed with the bit-depth default window.
    Linear,
}

/// How a batch of series is reconstructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    /// One rayon task per series.
    Rayon,
}

/// Anatomical plane a series is acquired in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SeriesLike {
    Axial,
    Coronal,
    Sagittal,
    Other,
    /// Projection radiographs are described by their _View Position_.
    ViewPosition(String),
}

impl fmt::Display for SeriesLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesLike::Axial => write!(f, "axial"),
            SeriesLike::Coronal => write!(f, "coronal"),
            SeriesLike::Sagittal => write!(f, "sagittal"),
            SeriesLike::Other => write!(f, "other"),
            SeriesLike::ViewPosition(view) => write!(f, "{view}"),
        }
    }
}

/// Handedness of the slice order relative to the slice normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Chirality {
    /// Positions advance along the row × column normal.
    Positive,
    Negative,
}

