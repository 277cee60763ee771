//! VM builder.
//!
//! A build is a fixed sequence of steps sharing one [`BuildState`]:
//!
//! 1. [`StepCreateVm`]: `lume create`, then the optional grace period
//! 2. [`StepSetVm`]: `lume set` for CPU, memory and display (skipped if unset)
//! 3. [`StepWaitIp`]: `lume ip --wait`, recording the address
//!
//! The first failing step halts the build and its error is returned.

mod ip;
mod runner;
mod state;
mod step_create;
mod step_ip;
mod step_set;

pub use ip::{ip_invocation, wait_for_ip, IP_PRE_DELAY_SECS, IP_WAIT_SECS};
pub use runner::{run_steps, Step, StepAction};
pub use state::BuildState;
pub use step_create::{create_args, StepCreateVm};
pub use step_ip::StepWaitIp;
pub use step_set::{set_args, StepSetVm};

use std::fmt;
use std::path::PathBuf;

use crate::cancel::CancelToken;
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::home::LumeHome;
use crate::lume::Lume;
use crate::ui::Ui;

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Name of the created VM.
    pub vm_name: String,
    /// IP address, unless the wait was skipped.
    pub ip: Option<String>,
    /// The VM's lume state folder.
    pub state_dir: PathBuf,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VM '{}' ({})", self.vm_name, self.state_dir.display())?;
        if let Some(ip) = &self.ip {
            write!(f, " at {}", ip)?;
        }
        Ok(())
    }
}

/// Builds one VM from a validated [`BuildConfig`].
#[derive(Debug, Clone)]
pub struct Builder {
    config: BuildConfig,
}

impl Builder {
    /// Validate `config` and prepare a builder.
    pub fn prepare(config: BuildConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The builder's configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The steps of a build, in order.
    pub fn steps(&self) -> Vec<Box<dyn Step>> {
        vec![
            Box::new(StepCreateVm),
            Box::new(StepSetVm),
            Box::new(StepWaitIp::default()),
        ]
    }

    /// Run the build.
    pub fn run(
        &self,
        ctx: &CancelToken,
        ui: &dyn Ui,
        lume: &Lume,
        home: &LumeHome,
    ) -> Result<Artifact> {
        self.run_steps(&self.steps(), ctx, ui, lume, home)
    }

    fn run_steps(
        &self,
        steps: &[Box<dyn Step>],
        ctx: &CancelToken,
        ui: &dyn Ui,
        lume: &Lume,
        home: &LumeHome,
    ) -> Result<Artifact> {
        let mut state = BuildState::new(&self.config, ui, lume);

        run_steps(steps, ctx, &mut state);

        if let Some(err) = state.error.take() {
            tracing::error!(vm = %self.config.vm_name, error = %err, "build failed");
            return Err(err);
        }
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let vm_name = state
            .vm_name()
            .ok_or(Error::MissingField("vm_name"))?
            .to_string();

        Ok(Artifact {
            state_dir: home.vm_dir(&vm_name),
            vm_name,
            ip: state.ip.take(),
        })
    }
}
