//! Build command implementation.

use clap::Args;
use lume_builder::{Builder, ConsoleUi, PostProcessor, Template};
use std::path::PathBuf;

use super::Session;

/// Run a build template.
///
/// Creates and configures the VM described by `[build]`, waits for its IP
/// address, then exports it if the template has an `[export]` table.
#[derive(Args, Debug)]
pub struct BuildCmd {
    /// Template file (TOML).
    pub template: PathBuf,

    /// Skip the export even if the template configures one.
    #[arg(long)]
    pub skip_export: bool,
}

impl BuildCmd {
    /// Execute the build command.
    pub fn run(self, session: &Session) -> lume_builder::Result<()> {
        let template = Template::load(&self.template)?;

        // Configure everything up front so bad settings fail before the VM exists
        let builder = Builder::prepare(template.build)?;
        let exporter = match template.export {
            Some(config) if !self.skip_export => {
                Some(PostProcessor::configure(config, &session.home)?)
            }
            _ => None,
        };

        let ui = ConsoleUi::new("lume.cli");
        let artifact = builder.run(&session.ctx, &ui, &session.lume, &session.home)?;
        println!("Build finished: {}", artifact);

        if let Some(exporter) = exporter {
            let ui = ConsoleUi::new("lume.export");
            let outcome = exporter.post_process(&session.ctx, &ui, artifact);
            outcome.result?;
            tracing::debug!(artifact = %outcome.artifact, keep = outcome.keep, "export finished");
        }

        Ok(())
    }
}
