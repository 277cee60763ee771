//! Child process utilities.
//!
//! Children are spawned in their own process group so that cancelling a
//! delayed invocation (`sh -c 'sleep N && lume ...'`) takes down the shell,
//! the sleep and the tool together.

use std::process::{Child, ExitStatus};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// How often a running child is polled for exit and cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Send SIGKILL to every process in a process group.
///
/// Returns true if the signal was sent successfully.
pub fn kill_group(pgid: libc::pid_t) -> bool {
    unsafe { libc::kill(-pgid, libc::SIGKILL) == 0 }
}

/// Wait for `child` to exit, killing its process group if `ctx` is cancelled.
///
/// The child must have been spawned as a process group leader.
pub fn wait_or_cancel(child: &mut Child, program: &str, ctx: &CancelToken) -> Result<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(source) => {
                return Err(Error::Spawn {
                    program: program.to_string(),
                    source,
                })
            }
        }

        if ctx.is_cancelled() {
            let pid = child.id() as libc::pid_t;
            tracing::debug!(pid = pid, program = program, "cancelled, killing process group");
            if !kill_group(pid) {
                let _ = child.kill();
            }
            // Reap
            let _ = child.wait();
            return Err(Error::Cancelled);
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
