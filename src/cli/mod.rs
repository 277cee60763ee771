//! CLI command implementations.

pub mod build;
pub mod export;
pub mod ip;

use lume_builder::{CancelToken, Lume, LumeHome};

/// Shared by every command: resolved once in `main`.
pub struct Session {
    /// Cancelled on SIGINT/SIGTERM.
    pub ctx: CancelToken,
    /// lume runner.
    pub lume: Lume,
    /// lume home directory.
    pub home: LumeHome,
}
