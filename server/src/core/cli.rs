use std::path::PathBuf;

use clap::Parser;

use super::constants::{ENV_API_HOST, ENV_API_PORT, ENV_CONFIG};

#[derive(Parser)]
#[command(name = "sda-server")]
#[command(version, about = "Sensitive Data Archive server", long_about = None)]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// API bind address
    #[arg(long, short = 'H', env = ENV_API_HOST)]
    pub host: Option<String>,

    /// API port
    #[arg(long, short = 'p', env = ENV_API_PORT)]
    pub port: Option<u16>,

    /// Disable the broker consumers, serve the admin API only
    #[arg(long)]
    pub no_workers: bool,
}

/// Parsed CLI configuration handed to `AppConfig::load`
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_workers: bool,
}

pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    CliConfig {
        config: cli.config,
        host: cli.host,
        port: cli.port,
        no_workers: cli.no_workers,
    }
}
