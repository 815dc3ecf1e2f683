use clap::Parser;
use std::path::PathBuf;

/// Search airports, browse destinations and keep favorite routes.
#[derive(Debug, Parser)]
#[command(name = "flightsearch", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.toml in the user config directory)
    #[arg(short, long, env = "FLIGHTSEARCH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Catalog database, overriding the configured path
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Preference file, overriding the configured path
    #[arg(long, value_name = "FILE")]
    pub preferences: Option<PathBuf>,
}
