//! Linear step runner.
//!
//! Steps run in order until one halts or the build is cancelled. Steps
//! leave what they created in place; nothing is rolled back.

use crate::cancel::CancelToken;
use crate::error::Error;

use super::state::BuildState;

/// What the runner does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Run the next step.
    Continue,
    /// Stop; the step recorded its error in the state.
    Halt,
}

/// One build step.
pub trait Step {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Run the step.
    fn run(&self, ctx: &CancelToken, state: &mut BuildState<'_>) -> StepAction;
}

/// Run `steps` in order, stopping at the first halt or on cancellation.
pub fn run_steps(
    steps: &[Box<dyn Step>],
    ctx: &CancelToken,
    state: &mut BuildState<'_>,
) -> StepAction {
    let mut action = StepAction::Continue;

    for step in steps {
        if ctx.is_cancelled() {
            action = state.halt(Error::Cancelled);
            break;
        }

        tracing::debug!(step = step.name(), "running step");
        action = step.run(ctx, state);

        if action == StepAction::Halt {
            tracing::debug!(step = step.name(), "step halted build");
            break;
        }
    }

    action
}
