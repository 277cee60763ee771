//! Export command implementation.

use clap::Args;
use lume_builder::config::DEFAULT_CHUNK_SIZE;
use lume_builder::{ConsoleUi, ExportConfig, NullUi, PostProcessor};

use super::Session;

/// Export an existing VM.
#[derive(Args, Debug)]
pub struct ExportCmd {
    /// VM name.
    #[arg(long)]
    pub vm_name: String,

    /// Image tag to report.
    #[arg(long)]
    pub tag: String,

    /// Chunk size for disk images over 500 MiB (e.g. "500M", "1G").
    #[arg(long, default_value = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: String,

    /// Print the manifest as JSON instead of progress output.
    #[arg(long)]
    pub json: bool,
}

impl ExportCmd {
    /// Execute the export command.
    pub fn run(self, session: &Session) -> lume_builder::Result<()> {
        let config = ExportConfig {
            vm_name: self.vm_name,
            tag: self.tag,
            chunk_size: self.chunk_size,
        };
        let exporter = PostProcessor::configure(config, &session.home)?;

        if self.json {
            let manifest = exporter.export(&session.ctx, &NullUi)?;
            println!("{}", manifest.to_json()?);
            return Ok(());
        }

        exporter.export(&session.ctx, &ConsoleUi::new("lume.export"))?;
        Ok(())
    }
}
