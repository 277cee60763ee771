//! Cancellation of in-flight work.
//!
//! A [`CancelToken`] is checked by the command runner while it waits on a
//! child process. The CLI wires it to SIGINT/SIGTERM with
//! [`install_signal_handlers`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

static SIGNAL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn handle_signal(_signum: libc::c_int) {
    // Only an atomic store: this runs in signal context.
    if let Some(flag) = SIGNAL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Cancel `token` on SIGINT or SIGTERM.
///
/// Only the first installed token is wired; later calls are ignored.
pub fn install_signal_handlers(token: &CancelToken) {
    if SIGNAL_FLAG.set(Arc::clone(&token.flag)).is_err() {
        tracing::debug!("signal handlers already installed");
        return;
    }

    let handler = handle_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }
}
