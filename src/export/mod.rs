//! Export post-processor.
//!
//! Packages a VM's lume state folder into an exportable set of files:
//!
//! ```text
//! <lume home>/<vm>/            save-image*/ (removed afterwards)
//!   config.json    ──copy──▶     config.json
//!   nvram.bin      ──copy──▶     nvram.bin
//!   disk.img       ──copy──▶     disk.img               (≤ 500 MiB)
//!                  ──split─▶     disk.img.part.00 ...   (> 500 MiB)
//! ```
//!
//! The resulting [`Manifest`] is reported to the UI. The work directory is
//! a [`tempfile::TempDir`], so it is removed on every exit path.

mod disk;
mod manifest;
mod size;

pub use disk::{
    copy_if_exists, find_parts, part_names, process_disk, should_split, split_file, DiskImage,
    PART_PREFIX, SPLIT_THRESHOLD_BYTES,
};
pub use manifest::{build_manifest, Manifest, ManifestEntry, MediaType, Part};
pub use size::parse_chunk_size;

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::{ExportConfig, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::home::{validate_vm_name, LumeHome, CONFIG_FILENAME, DISK_FILENAME, NVRAM_FILENAME};
use crate::ui::Ui;

/// Prefix of the temporary work directory.
pub const WORK_DIR_PREFIX: &str = "save-image";

/// Outcome of post-processing an artifact.
///
/// The artifact is always handed back unchanged. On success `keep` and
/// `force_override` are true; on failure both are false.
#[derive(Debug)]
pub struct PostProcessed<A> {
    /// The input artifact.
    pub artifact: A,
    /// Whether the input artifact should be kept.
    pub keep: bool,
    /// Whether later post-processors should still run on it.
    pub force_override: bool,
    /// Manifest of the exported files, or the failure.
    pub result: Result<Manifest>,
}

/// Exports a VM's state folder.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    config: ExportConfig,
    vm_dir: PathBuf,
    chunk_bytes: u64,
    split_threshold: u64,
}

impl PostProcessor {
    /// Apply defaults and resolve the VM's state folder under `home`.
    ///
    /// Fails only on an invalid chunk size; required fields are checked
    /// when the export runs.
    pub fn configure(mut config: ExportConfig, home: &LumeHome) -> Result<Self> {
        if config.chunk_size.trim().is_empty() {
            config.chunk_size = DEFAULT_CHUNK_SIZE.to_string();
        }
        let chunk_bytes = parse_chunk_size(&config.chunk_size)?;
        let vm_dir = home.vm_dir(&config.vm_name);

        Ok(Self {
            config,
            vm_dir,
            chunk_bytes,
            split_threshold: SPLIT_THRESHOLD_BYTES,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_split_threshold(mut self, bytes: u64) -> Self {
        self.split_threshold = bytes;
        self
    }

    /// The export configuration after defaults.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// State folder being exported.
    pub fn vm_dir(&self) -> &Path {
        &self.vm_dir
    }

    /// Export, handing `source` back with keep/override flags.
    pub fn post_process<A>(&self, ctx: &CancelToken, ui: &dyn Ui, source: A) -> PostProcessed<A> {
        let result = self.export(ctx, ui);
        let ok = result.is_ok();
        PostProcessed {
            artifact: source,
            keep: ok,
            force_override: ok,
            result,
        }
    }

    /// Export the VM state folder and return the manifest.
    pub fn export(&self, ctx: &CancelToken, ui: &dyn Ui) -> Result<Manifest> {
        self.validate()?;

        let work_dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(&self.vm_dir)
            .map_err(|e| Error::filesystem("create work directory", &self.vm_dir, e))?;
        ui.say(&format!("Working directory: {}", work_dir.path().display()));

        let result = self.export_into(ctx, ui, work_dir.path());

        let path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove work directory");
        }

        match &result {
            Ok(manifest) => tracing::info!(
                vm = %self.config.vm_name,
                tag = %manifest.tag,
                files = manifest.entries.len(),
                "export finished"
            ),
            Err(e) => tracing::error!(vm = %self.config.vm_name, error = %e, "export failed"),
        }
        result
    }

    fn validate(&self) -> Result<()> {
        if self.config.vm_name.trim().is_empty() {
            return Err(Error::MissingField("vm_name"));
        }
        validate_vm_name(&self.config.vm_name)?;
        if self.config.tag.trim().is_empty() {
            return Err(Error::MissingField("tag"));
        }
        Ok(())
    }

    fn export_into(&self, ctx: &CancelToken, ui: &dyn Ui, work_dir: &Path) -> Result<Manifest> {
        for name in [CONFIG_FILENAME, NVRAM_FILENAME] {
            let src = self.vm_dir.join(name);
            if src.exists() {
                ui.say(&format!("Copying {}...", name));
            }
            copy_if_exists(&src, &work_dir.join(name))?;
        }

        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let disk = process_disk(
            ctx,
            ui,
            &self.vm_dir.join(DISK_FILENAME),
            work_dir,
            self.chunk_bytes,
            self.split_threshold,
        )?;

        let manifest = build_manifest(work_dir, &disk, &self.config.tag)?;

        ui.say(&format!("Image saved with tag: {}", manifest.tag));
        ui.say("The following files are part of the image artifact:");
        for line in manifest.lines() {
            ui.say(&format!("  - {}", line));
        }

        Ok(manifest)
    }
}
