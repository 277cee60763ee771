//! Wait for the created VM to become reachable.

use crate::cancel::CancelToken;
use crate::error::Error;

use super::ip::{query_ip, IP_PRE_DELAY_SECS};
use super::runner::{Step, StepAction};
use super::state::BuildState;

/// Records the VM's IP address in the build state.
#[derive(Debug)]
pub struct StepWaitIp {
    pre_delay_secs: u64,
}

impl Default for StepWaitIp {
    fn default() -> Self {
        Self {
            pre_delay_secs: IP_PRE_DELAY_SECS,
        }
    }
}

impl StepWaitIp {
    #[cfg(test)]
    pub(crate) fn without_delay() -> Self {
        Self { pre_delay_secs: 0 }
    }
}

impl Step for StepWaitIp {
    fn name(&self) -> &'static str {
        "wait-ip"
    }

    fn run(&self, ctx: &CancelToken, state: &mut BuildState<'_>) -> StepAction {
        if state.config.skip_ip_wait {
            return StepAction::Continue;
        }

        let Some(vm_name) = state.vm_name().map(str::to_string) else {
            return state.halt(Error::MissingField("vm_name"));
        };

        state.ui.say("Waiting for the VM to report an IP address...");

        let config = state.config;
        match query_ip(state.lume, ctx, &vm_name, &config.ip_extra_args, self.pre_delay_secs) {
            Ok(ip) if ip.is_empty() => {
                state.halt(Error::IpLookup(Box::new(Error::NoIpAddress(vm_name))))
            }
            Ok(ip) => {
                tracing::info!(vm = %vm_name, ip = %ip, "vm reachable");
                state.ui.say(&format!("VM IP address: {}", ip));
                state.ip = Some(ip);
                StepAction::Continue
            }
            Err(e) => state.halt(Error::IpLookup(Box::new(e))),
        }
    }
}
