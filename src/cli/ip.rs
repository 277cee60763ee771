//! IP command implementation.

use clap::Args;
use lume_builder::builder::wait_for_ip;

use super::Session;

/// Print a VM's IP address once it has one.
///
/// Waits a fixed two minutes before asking lume, then lets lume wait up to
/// another two minutes.
#[derive(Args, Debug)]
pub struct IpCmd {
    /// VM name.
    pub name: String,

    /// Extra arguments passed to `lume ip`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

impl IpCmd {
    /// Execute the ip command.
    pub fn run(self, session: &Session) -> lume_builder::Result<()> {
        let ip = wait_for_ip(&session.lume, &session.ctx, &self.name, &self.extra)?;
        println!("{}", ip);
        Ok(())
    }
}
