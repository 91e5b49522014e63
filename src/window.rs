use std::fmt;

/// Which window to apply in the VOI stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Window {
    /// The window embedded in the record.
    #[default]
    Default,
    /// A named preset from [`PRESET_WINDOWS`], e.g. `"lung"`.
    Preset(String),
    /// An explicit window.
    Explicit { center: f64, width: f64 },
}

impl Window {
    pub fn preset(name: &str) -> Self {
        Window::Preset(name.to_string())
    }

    pub fn explicit(center: f64, width: f64) -> Self {
        Window::Explicit { center, width }
    }
}

impl From<&str> for Window {
    /// `"default"` selects the record's own window, anything else a preset.
    fn from(value: &str) -> Self {
        if value == "default" {
            Window::Default
        } else {
            Window::Preset(value.to_string())
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Default => write!(f, "default"),
            Window::Preset(name) => write!(f, "{name}"),
            Window::Explicit { center, width } => write!(f, "C{center}/W{width}"),
        }
    }
}

/// Preset windows in Hounsfield units as (name, center, width).
pub const PRESET_WINDOWS: [(&str, f64, f64); 6] = [
    ("abdomen", 60., 400.),
    ("angio", 300., 600.),
    ("bone", 300., 1500.),
    ("brain", 40., 80.),
    ("mediastinum", 40., 400.),
    ("lung", -750., 1500.),
];

/// Window used for preset names that are not in [`PRESET_WINDOWS`].
pub const DEFAULT_PRESET_WINDOW: (f64, f64) = (0., 2000.);

/// Look up the (center, width) of a body part or material, lower case.
pub fn preset_window(body_part: &str) -> (f64, f64) {
    PRESET_WINDOWS
        .iter()
        .find(|(name, _, _)| *name == body_part)
        .map(|&(_, center, width)| (center, width))
        .unwrap_or(DEFAULT_PRESET_WINDOW)
}
