use anyhow::{Context, Result};
use screenos_convert::report::render_commands;
use screenos_core::parse_file;

use crate::cli::{OutputFormat, ParseArgs};

pub fn run_parse(args: ParseArgs) -> Result<()> {
    let parsed = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let commands = if args.all {
        &parsed.all
    } else {
        &parsed.processed
    };

    match args.format {
        OutputFormat::Text => println!("{}", render_commands(commands)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(commands)?),
    }

    Ok(())
}
