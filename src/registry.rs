use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostics, Stage, Warning};
use crate::record::SliceRecord;

/// Flags attached to a mode when it is registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registration {
    pub retired: bool,
    pub experimental: bool,
    /// Keep an existing handler instead of overwriting it.
    pub skip_if_exists: bool,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retired(mut self) -> Self {
        self.retired = true;
        self
    }

    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    pub fn skip_if_exists(mut self) -> Self {
        self.skip_if_exists = true;
        self
    }
}

#[derive(Debug)]
struct Entry<H> {
    handler: H,
    retired: bool,
    experimental: bool,
}

/// Dispatch table from a mode string to its handler.
///
/// Tables are filled once, when a stage is built, and read afterwards.
#[derive(Debug)]
pub struct Registry<H> {
    stage: Stage,
    entries: BTreeMap<String, Entry<H>>,
}

impl<H: Copy> Registry<H> {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            entries: BTreeMap::new(),
        }
    }

    /// Associate `mode` with `handler`.
    ///
    /// Returns a warning when `mode` already had a handler: it is replaced,
    /// or kept if `skip_if_exists` is set.
    pub fn register(
        &mut self,
        mode: impl Into<String>,
        handler: H,
        registration: Registration,
    ) -> Option<Warning> {
        let mode = mode.into();
        let mut warning = None;
        if self.entries.contains_key(&mode) {
            if registration.skip_if_exists {
                let skipped = Warning::ModeSkipped {
                    stage: self.stage,
                    mode,
                };
                tracing::warn!("{skipped}");
                return Some(skipped);
            }
            let overwritten = Warning::ModeOverwritten {
                stage: self.stage,
                mode: mode.clone(),
            };
            tracing::warn!("{overwritten}");
            warning = Some(overwritten);
        }
        self.entries.insert(
            mode,
            Entry {
                handler,
                retired: registration.retired,
                experimental: registration.experimental,
            },
        );
        warning
    }

    /// Builder form of [`register`](Self::register) for declaring tables.
    ///
    /// A duplicate mode follows the same policy, but its warning is only
    /// emitted through `tracing`.
    pub fn with(mut self, mode: &str, handler: H, registration: Registration) -> Self {
        self.register(mode, handler, registration);
        self
    }

    /// Look up the handler of `mode`, reporting anything notable about it.
    pub fn resolve(&self, mode: Option<&str>, diagnostics: &mut Diagnostics) -> Option<H> {
        let Some(mode) = mode else {
            diagnostics.push(Warning::Unclassified { stage: self.stage });
            return None;
        };
        let Some(entry) = self.entries.get(mode) else {
            diagnostics.push(Warning::NotImplemented {
                stage: self.stage,
                mode: mode.to_string(),
            });
            return None;
        };
        if entry.retired {
            diagnostics.push(Warning::RetiredMode {
                stage: self.stage,
                mode: mode.to_string(),
            });
        }
        if entry.experimental {
            diagnostics.push(Warning::ExperimentalMode {
                stage: self.stage,
                mode: mode.to_string(),
            });
        }
        Some(entry.handler)
    }

    /// Registered modes in sorted order.
    pub fn modes(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// A pipeline stage: a classifier plus the table of handlers it selects from.
pub trait TransformStage {
    type Handler: Copy;

    /// Derive the mode of this stage from a record. Pure and total.
    fn classify(&self, record: &dyn SliceRecord) -> Option<String>;

    fn registry(&self) -> &Registry<Self::Handler>;

    /// Classify `record` and look up the matching handler.
    fn resolve(
        &self,
        record: &dyn SliceRecord,
        diagnostics: &mut Diagnostics,
    ) -> (Option<String>, Option<Self::Handler>) {
        let mode = self.classify(record);
        let handler = self.registry().resolve(mode.as_deref(), diagnostics);
        (mode, handler)
    }

    fn modes(&self) -> Vec<&str> {
        self.registry().modes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one() -> u8 {
        1
    }

    fn two() -> u8 {
        2
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let mut registry: Registry<fn() -> u8> = Registry::new(Stage::Voi);
        assert_eq!(registry.register("X", one, Registration::new()), None);
        let warning = registry.register("X", two, Registration::new());
        assert_eq!(
            warning,
            Some(Warning::ModeOverwritten {
                stage: Stage::Voi,
                mode: "X".to_string()
            })
        );
        let mut diagnostics = Diagnostics::new();
        let handler = registry.resolve(Some("X"), &mut diagnostics).unwrap();
        assert_eq!(handler(), 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn duplicate_registration_skipped() {
        let mut registry: Registry<fn() -> u8> = Registry::new(Stage::Voi);
        registry.register("X", one, Registration::new());
        let warning = registry.register("X", two, Registration::new().skip_if_exists());
        assert_eq!(
            warning,
            Some(Warning::ModeSkipped {
                stage: Stage::Voi,
                mode: "X".to_string()
            })
        );
        let mut diagnostics = Diagnostics::new();
        let handler = registry.resolve(Some("X"), &mut diagnostics).unwrap();
        assert_eq!(handler(), 1);
    }

    #[test]
    fn resolve_reports_flags_and_missing_modes() {
        let registry = Registry::<fn() -> u8>::new(Stage::Photometric)
            .with("OLD", one, Registration::new().retired())
            .with("NEW", two, Registration::new().experimental());

        let mut diagnostics = Diagnostics::new();
        assert!(registry.resolve(Some("OLD"), &mut diagnostics).is_some());
        assert!(registry.resolve(Some("NEW"), &mut diagnostics).is_some());
        assert!(registry.resolve(Some("NONE"), &mut diagnostics).is_none());
        assert!(registry.resolve(None, &mut diagnostics).is_none());
        assert_eq!(
            diagnostics.warnings(),
            &[
                Warning::RetiredMode {
                    stage: Stage::Photometric,
                    mode: "OLD".to_string()
                },
                Warning::ExperimentalMode {
                    stage: Stage::Photometric,
                    mode: "NEW".to_string()
                },
                Warning::NotImplemented {
                    stage: Stage::Photometric,
                    mode: "NONE".to_string()
                },
                Warning::Unclassified {
                    stage: Stage::Photometric
                },
            ]
        );
    }

    #[test]
    fn builder_applies_duplicate_policy() {
        let registry = Registry::<fn() -> u8>::new(Stage::Voi)
            .with("X", one, Registration::new())
            .with("X", two, Registration::new())
            .with("Y", one, Registration::new())
            .with("Y", two, Registration::new().skip_if_exists());
        let mut diagnostics = Diagnostics::new();
        assert_eq!(registry.resolve(Some("X"), &mut diagnostics).unwrap()(), 2);
        assert_eq!(registry.resolve(Some("Y"), &mut diagnostics).unwrap()(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn modes_are_sorted() {
        let registry = Registry::<fn() -> u8>::new(Stage::Modality)
            .with("TABLE", one, Registration::new())
            .with("LINEAR", two, Registration::new());
        assert_eq!(registry.modes(), vec!["LINEAR", "TABLE"]);
    }
}
