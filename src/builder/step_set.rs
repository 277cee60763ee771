//! `lume set`.

use crate::cancel::CancelToken;
use crate::config::BuildConfig;
use crate::error::Error;
use crate::lume::Invocation;

use super::runner::{Step, StepAction};
use super::state::BuildState;

/// Arguments for `lume set`, or `None` when nothing needs updating.
///
/// Memory is configured in megabytes and handed to `set` multiplied by 1024.
pub fn set_args(config: &BuildConfig) -> Option<Vec<String>> {
    if !config.needs_update() {
        return None;
    }

    let mut args = vec!["set".to_string(), config.vm_name.clone()];

    if config.cpu_count > 0 {
        args.extend(["--cpu".to_string(), config.cpu_count.to_string()]);
    }
    if config.memory_mb > 0 {
        let memory = u64::from(config.memory_mb) * 1024;
        args.extend(["--memory".to_string(), memory.to_string()]);
    }
    if let Some(display) = config.display() {
        args.extend(["--display".to_string(), display.to_string()]);
    }

    Some(args)
}

/// Applies CPU, memory and display settings to the created VM.
#[derive(Debug, Default)]
pub struct StepSetVm;

impl Step for StepSetVm {
    fn name(&self) -> &'static str {
        "set-vm"
    }

    fn run(&self, ctx: &CancelToken, state: &mut BuildState<'_>) -> StepAction {
        let Some(args) = set_args(state.config) else {
            tracing::debug!("no resources to update");
            return StepAction::Continue;
        };

        state.ui.say("Updating virtual machine resources...");

        let invocation = Invocation::new(args);
        if let Err(e) = state.lume.execute(ctx, &invocation, Some(state.ui)) {
            return state.halt(Error::VmUpdate(Box::new(e)));
        }

        StepAction::Continue
    }
}
