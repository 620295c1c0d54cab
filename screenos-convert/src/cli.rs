use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "screenos-convert")]
#[command(about = "Parse and convert ScreenOS firewall configurations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Log conversion progress to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Show the parsed statements of one config.
    Parse(ParseArgs),
    /// Convert one config into the normalized policy model.
    Convert(ConvertArgs),
    /// Show parse and conversion statistics for one config.
    Stats(StatsArgs),
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    pub file: PathBuf,
    /// Show every line in file order instead of aggregated statements.
    #[arg(long)]
    pub all: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    pub file: PathBuf,
    /// Leave MIP, VIP, DIP and policy NAT unconverted.
    #[arg(long)]
    pub no_nat: bool,
    /// Predefined service tables (TOML). Defaults to the built-in tables.
    #[arg(long)]
    pub knowledge: Option<PathBuf>,
    /// Name of the policy package and its parent layer.
    #[arg(long)]
    pub package_name: Option<String>,
    /// Write the full conversion result as JSON to this path.
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Fail when any statement needs manual action.
    #[arg(long)]
    pub strict: bool,
    /// Also print the converted policy package.
    #[arg(long)]
    pub rules: bool,
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub no_nat: bool,
    #[arg(long)]
    pub knowledge: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
