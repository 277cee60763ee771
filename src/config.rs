//! Build and export configuration.
//!
//! Configuration is read once from a TOML template and is immutable for
//! the rest of the run:
//!
//! ```toml
//! [build]
//! vm_name = "macos-runner"
//! ipsw = "latest"
//! cpu_count = 4
//! memory_mb = 8192
//! disk_size_gb = 80
//! create_grace_time = "30s"
//!
//! [export]
//! tag = "ghcr.io/acme/macos:15"
//! chunk_size = "500M"
//! ```

use crate::error::{Error, Result};
use crate::home::validate_vm_name;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default export chunk size.
pub const DEFAULT_CHUNK_SIZE: &str = "500M";

/// Builder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Name of the VM to create (required, unique per build).
    pub vm_name: String,

    /// Restore image passed to `lume create --ipsw` (path or "latest").
    pub ipsw: Option<String>,

    /// Number of vCPUs (0 = lume default).
    pub cpu_count: u32,

    /// Memory in megabytes (0 = lume default).
    pub memory_mb: u32,

    /// Disk size in gigabytes (0 = lume default).
    pub disk_size_gb: u32,

    /// Display resolution, e.g. "1024x768".
    pub display: Option<String>,

    /// Fixed wait after `lume create` succeeds, e.g. "30s".
    #[serde(with = "duration_str")]
    pub create_grace_time: Duration,

    /// Extra arguments appended to `lume ip`.
    pub ip_extra_args: Vec<String>,

    /// Do not wait for the VM's IP address (no guest connection needed).
    pub skip_ip_wait: bool,
}

impl BuildConfig {
    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        if self.vm_name.trim().is_empty() {
            return Err(Error::MissingField("vm_name"));
        }
        validate_vm_name(&self.vm_name)
    }

    /// Restore image, if one was given.
    pub fn ipsw(&self) -> Option<&str> {
        self.ipsw.as_deref().filter(|s| !s.is_empty())
    }

    /// Display resolution, if one was given.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether any resource the `set` step manages was requested.
    pub fn needs_update(&self) -> bool {
        self.cpu_count > 0 || self.memory_mb > 0 || self.display().is_some()
    }
}

/// Export post-processor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// VM whose state folder is exported. Empty inherits the build's VM.
    pub vm_name: String,

    /// Image tag reported with the artifact (required).
    pub tag: String,

    /// Size of each disk chunk in `split -b` syntax, e.g. "500M".
    pub chunk_size: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            vm_name: String::new(),
            tag: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE.to_string(),
        }
    }
}

/// A build template: one builder and an optional export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Builder settings.
    pub build: BuildConfig,

    /// Export settings; no export runs when absent.
    #[serde(default)]
    pub export: Option<ExportConfig>,
}

impl Template {
    /// Load a template from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|e| match e {
            Error::ConfigLoad { reason, .. } => Error::ConfigLoad {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a template from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut template: Template = toml::from_str(text).map_err(|e| Error::ConfigLoad {
            path: "<inline>".into(),
            reason: e.message().to_string(),
        })?;

        if let Some(export) = template.export.as_mut() {
            if export.vm_name.is_empty() {
                export.vm_name = template.build.vm_name.clone();
            }
            if export.chunk_size.is_empty() {
                export.chunk_size = DEFAULT_CHUNK_SIZE.to_string();
            }
        }

        Ok(template)
    }
}

/// Human-readable durations ("30s", "2m") via humantime.
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() || s.trim() == "0" {
            return Ok(Duration::ZERO);
        }
        humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
    }
}
