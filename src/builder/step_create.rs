//! `lume create`.

use crate::cancel::CancelToken;
use crate::config::BuildConfig;
use crate::error::Error;
use crate::lume::Invocation;

use super::runner::{Step, StepAction};
use super::state::BuildState;

/// Arguments for `lume create`. Flags only for values that were set; the
/// VM name is always last.
pub fn create_args(config: &BuildConfig) -> Vec<String> {
    let mut args = vec!["create".to_string()];

    if let Some(ipsw) = config.ipsw() {
        args.extend(["--ipsw".to_string(), ipsw.to_string()]);
    }
    if config.cpu_count > 0 {
        args.extend(["--cpu".to_string(), config.cpu_count.to_string()]);
    }
    if config.memory_mb > 0 {
        args.extend(["--memory".to_string(), config.memory_mb.to_string()]);
    }
    if config.disk_size_gb > 0 {
        args.extend(["--disk-size".to_string(), config.disk_size_gb.to_string()]);
    }

    args.push(config.vm_name.clone());
    args
}

/// Creates the VM, then waits out the configured grace period.
#[derive(Debug, Default)]
pub struct StepCreateVm;

impl Step for StepCreateVm {
    fn name(&self) -> &'static str {
        "create-vm"
    }

    fn run(&self, ctx: &CancelToken, state: &mut BuildState<'_>) -> StepAction {
        let config = state.config;
        let ui = state.ui;

        ui.say("Creating virtual machine...");

        let invocation = Invocation::new(create_args(config));
        if let Err(e) = state.lume.execute(ctx, &invocation, Some(ui)) {
            return state.halt(Error::VmCreation(Box::new(e)));
        }

        if let Err(e) = state.record_vm_name(&config.vm_name) {
            return state.halt(e);
        }
        tracing::info!(vm = %config.vm_name, "vm created");

        let grace = config.create_grace_time;
        if !grace.is_zero() {
            ui.say(&format!(
                "Waiting {} to let the Virtualization.Framework's installation process finish correctly...",
                humantime::format_duration(grace)
            ));
            std::thread::sleep(grace);
        }

        StepAction::Continue
    }
}
