//! lume-builder CLI entry point.

use clap::{Parser, Subcommand};
use lume_builder::{cancel, CancelToken, Lume, LumeHome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

/// lume-builder - build and export macOS VM images with lume
#[derive(Parser, Debug)]
#[command(name = "lume-builder")]
#[command(about = "Build and export macOS VM images with lume")]
#[command(version)]
struct Cli {
    /// lume executable to run.
    #[arg(long, global = true, default_value = lume_builder::lume::LUME_COMMAND)]
    lume: PathBuf,

    /// Argument placed before every lume subcommand (repeatable), e.g.
    /// `--lume ssh --lume-arg mac-mini --lume-arg lume`.
    #[arg(long = "lume-arg", global = true, value_name = "ARG")]
    lume_args: Vec<String>,

    /// lume home directory (default: $LUME_HOME, then ~/.lume).
    #[arg(long, global = true)]
    lume_home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, configure and boot a VM from a template, then export it.
    Build(cli::build::BuildCmd),

    /// Package a VM's disk and metadata into an exportable file set.
    Export(cli::export::ExportCmd),

    /// Wait for a VM to report its IP address.
    Ip(cli::ip::IpCmd),
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on RUST_LOG or default to warn
    init_logging();

    tracing::debug!(version = lume_builder::VERSION, "starting lume-builder");

    let ctx = CancelToken::new();
    cancel::install_signal_handlers(&ctx);

    let result = LumeHome::resolve(cli.lume_home).and_then(|home| {
        let session = cli::Session {
            ctx,
            lume: Lume::with_base_args(cli.lume, cli.lume_args),
            home,
        };

        match cli.command {
            Commands::Build(cmd) => cmd.run(&session),
            Commands::Export(cmd) => cmd.run(&session),
            Commands::Ip(cmd) => cmd.run(&session),
        }
    });

    // Handle errors
    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lume_builder=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
