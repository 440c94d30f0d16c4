use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use site_logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "portfolio",
    version,
    about = "Serve the portfolio page and its chat proxy"
)]
pub struct Args {
    /// Path to the RON config file. A missing file means defaults.
    #[arg(long, default_value = "portfolio.ron")]
    pub config: PathBuf,

    /// Address to listen on, overriding the config file.
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Minimum log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
