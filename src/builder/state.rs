//! State shared by the build steps.

use std::cell::OnceCell;

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::lume::Lume;
use crate::ui::Ui;

use super::runner::StepAction;

/// Typed state passed by reference from step to step within one build.
pub struct BuildState<'a> {
    /// Build configuration.
    pub config: &'a BuildConfig,
    /// Progress sink.
    pub ui: &'a dyn Ui,
    /// lume runner.
    pub lume: &'a Lume,
    /// IP address reported by `lume ip`.
    pub ip: Option<String>,
    /// Error that halted the pipeline.
    pub error: Option<Error>,
    vm_name: OnceCell<String>,
}

impl<'a> BuildState<'a> {
    /// Fresh state for one build.
    pub fn new(config: &'a BuildConfig, ui: &'a dyn Ui, lume: &'a Lume) -> Self {
        Self {
            config,
            ui,
            lume,
            ip: None,
            error: None,
            vm_name: OnceCell::new(),
        }
    }

    /// Name of the created VM, once recorded.
    pub fn vm_name(&self) -> Option<&str> {
        self.vm_name.get().map(String::as_str)
    }

    /// Record the created VM's name. A name can be recorded only once.
    pub fn record_vm_name(&mut self, name: &str) -> Result<()> {
        self.vm_name
            .set(name.to_string())
            .map_err(|requested| Error::VmNameConflict {
                existing: self.vm_name.get().cloned().unwrap_or_default(),
                requested,
            })
    }

    /// Record `error` and signal the runner to stop.
    pub fn halt(&mut self, error: Error) -> StepAction {
        tracing::debug!(error = %error, "halting build");
        self.error = Some(error);
        StepAction::Halt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::RecordingUi;

    #[test]
    fn test_vm_name_is_set_once() {
        let config = BuildConfig::default();
        let ui = RecordingUi::new();
        let lume = Lume::default();
        let mut state = BuildState::new(&config, &ui, &lume);

        assert!(state.vm_name().is_none());
        state.record_vm_name("vm1").unwrap();
        assert_eq!(state.vm_name(), Some("vm1"));

        let err = state.record_vm_name("vm2").unwrap_err();
        assert!(matches!(err, Error::VmNameConflict { .. }));
        assert_eq!(state.vm_name(), Some("vm1"));
    }

    #[test]
    fn test_halt_records_error() {
        let config = BuildConfig::default();
        let ui = RecordingUi::new();
        let lume = Lume::default();
        let mut state = BuildState::new(&config, &ui, &lume);

        assert_eq!(state.halt(Error::Cancelled), StepAction::Halt);
        assert!(matches!(state.error, Some(Error::Cancelled)));
    }
}
