use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

mod cli;
mod convert_cmd;
mod parse_cmd;
mod path_guard;
mod stats_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match cli.command {
        Command::Parse(args) => parse_cmd::run_parse(args),
        Command::Convert(args) => convert_cmd::run_convert(args),
        Command::Stats(args) => stats_cmd::run_stats(args),
    }
}
