use std::fmt;

/// The pipeline stage a warning originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Modality,
    Voi,
    Photometric,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Modality => write!(f, "modality"),
            Stage::Voi => write!(f, "VOI"),
            Stage::Photometric => write!(f, "photometric interpretation"),
        }
    }
}

/// A non-fatal condition met while registering, transforming or reconstructing.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// A mode was registered again and the new handler replaced the old one.
    ModeOverwritten { stage: Stage, mode: String },
    /// A mode was registered again and the new handler was dropped.
    ModeSkipped { stage: Stage, mode: String },
    /// The record could not be classified; the stage was an identity.
    Unclassified { stage: Stage },
    /// The record was classified but no handler exists for that mode.
    NotImplemented { stage: Stage, mode: String },
    RetiredMode { stage: Stage, mode: String },
    ExperimentalMode { stage: Stage, mode: String },
    /// Two consecutive slices share the same position.
    ZeroSpacing { from: i64, to: i64 },
    /// Two records carry the same instance number; the later one was kept.
    DuplicateInstance { index: i64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ModeOverwritten { stage, mode } => {
                write!(f, "{stage} mode \"{mode}\" was already registered. Overwrite")
            }
            Warning::ModeSkipped { stage, mode } => {
                write!(f, "{stage} mode \"{mode}\" was already registered. Skip")
            }
            Warning::Unclassified { stage } => {
                write!(f, "{stage} mode could not be determined, nothing applied")
            }
            Warning::NotImplemented { stage, mode } => {
                write!(f, "{stage} mode \"{mode}\" is not implemented")
            }
            Warning::RetiredMode { stage, mode } => write!(f, "{stage} mode \"{mode}\" is retired"),
            Warning::ExperimentalMode { stage, mode } => {
                write!(f, "{stage} mode \"{mode}\" is experimental")
            }
            Warning::ZeroSpacing { from, to } => write!(f, "spacing between {from} and {to} is 0"),
            Warning::DuplicateInstance { index } => {
                write!(f, "instance number {index} appears more than once")
            }
        }
    }
}

/// Warnings collected during one call, returned to the caller.
///
/// Each pushed warning is also emitted as a `tracing` event so that callers
/// with a subscriber installed see it without inspecting the list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.warnings.contains(warning)
    }
}
