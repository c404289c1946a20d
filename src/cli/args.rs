//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(
    name = "settlewatch",
    version,
    about = "Report once a file has stopped changing",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to a settings TOML file
    #[arg(short, long, global = true, env = "SETTLEWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch a file and print a line each time it settles
    #[command(about = "Watch a file and print a line each time it settles")]
    Watch {
        /// File to watch (its directory must exist)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Quiet period in milliseconds (overrides config)
        #[arg(short = 'd', long)]
        dead_time_ms: Option<u64>,

        /// Stop after this many settled-events
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Drop settled-events nobody is waiting for instead of blocking
        #[arg(long)]
        best_effort: bool,
    },

    /// Display active settings
    #[command(about = "Display active settings")]
    Config,
}
