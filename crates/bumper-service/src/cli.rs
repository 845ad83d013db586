//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bumper")]
#[command(about = "ETH bumper order service", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", env = "BUMPER_CONFIG", default_value = "config/local.toml")]
	pub config: PathBuf,

	/// Log level used when RUST_LOG is unset; overrides the config value
	#[arg(short, long, env = "BUMPER_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Start the HTTP service (default)
	Start,
	/// Validate the configuration file and plugin tables
	Validate,
}
