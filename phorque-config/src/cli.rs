//! Command-line surface.

use clap::Parser;

/// An elastic cluster autoscaler bridging a batch job scheduler and one or
/// more IaaS clouds.
#[derive(Debug, Parser)]
#[command(name = "phorque", about, version)]
pub struct Cli {
    /// Location of the config file.
    #[arg(short = 'c', long = "config_file", default_value = "etc/phorque.conf")]
    pub config_file: String,

    /// Enable debug-level logging.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}
