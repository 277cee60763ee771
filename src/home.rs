//! Location of lume's per-VM state folders.
//!
//! lume keeps every VM in `<home>/<vm name>/`, holding `config.json`,
//! `nvram.bin` and `disk.img`. The home directory is resolved once at
//! startup and passed to everything that needs it.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the lume home directory.
pub const LUME_HOME_ENV: &str = "LUME_HOME";

/// Default home directory name under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".lume";

/// VM metadata filename.
pub const CONFIG_FILENAME: &str = "config.json";

/// EFI variable store filename.
pub const NVRAM_FILENAME: &str = "nvram.bin";

/// Disk image filename.
pub const DISK_FILENAME: &str = "disk.img";

/// Resolved lume home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumeHome {
    root: PathBuf,
}

impl LumeHome {
    /// Use `root` as the lume home directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the home directory.
    ///
    /// Order: explicit override, then `LUME_HOME`, then `~/.lume`.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let env = std::env::var_os(LUME_HOME_ENV).map(PathBuf::from);
        Self::resolve_from(explicit, env, dirs::home_dir())
    }

    fn resolve_from(
        explicit: Option<PathBuf>,
        env: Option<PathBuf>,
        user_home: Option<PathBuf>,
    ) -> Result<Self> {
        let root = explicit
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| env.filter(|p| !p.as_os_str().is_empty()))
            .or_else(|| user_home.map(|h| h.join(DEFAULT_HOME_DIR)))
            .ok_or(Error::HomeNotFound)?;

        tracing::debug!(home = %root.display(), "resolved lume home");
        Ok(Self { root })
    }

    /// The home directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// State folder of the named VM.
    ///
    /// Callers check the name with [`validate_vm_name`] first.
    pub fn vm_dir(&self, vm_name: &str) -> PathBuf {
        self.root.join(vm_name)
    }
}

/// Check that `name` names a single folder directly under the lume home.
pub fn validate_vm_name(name: &str) -> Result<()> {
    let reason = if name == "." || name == ".." {
        "must not be a relative directory"
    } else if name.contains(['/', '\\']) {
        "must not contain path separators"
    } else if name.contains('\0') {
        "must not contain NUL"
    } else {
        return Ok(());
    };

    Err(Error::InvalidVmName {
        name: name.to_string(),
        reason,
    })
}
