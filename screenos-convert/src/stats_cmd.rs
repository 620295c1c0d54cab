use anyhow::{Context, Result};
use serde::Serialize;
use screenos_convert::convert::{convert, ConvertOptions};
use screenos_convert::report::{render_object_counts, render_parse_stats, render_summary};
use screenos_convert::stats::{summarize, ConversionStats};
use screenos_core::{parse_file, ParseStats};

use crate::cli::{OutputFormat, StatsArgs};
use crate::convert_cmd::knowledge_base;

#[derive(Serialize)]
struct StatsReport<'a> {
    parse: &'a ParseStats,
    conversion: ConversionStats,
}

pub fn run_stats(args: StatsArgs) -> Result<()> {
    let parsed = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let knowledge = knowledge_base(args.knowledge.as_deref())?;
    let options = ConvertOptions {
        include_nat: !args.no_nat,
        ..ConvertOptions::default()
    };
    let result = convert(&parsed, &knowledge, &options);

    match args.format {
        OutputFormat::Text => {
            println!("{}", render_parse_stats(&parsed.stats));
            println!("{}", render_object_counts(&result));
            println!("{}", render_summary(&result));
        }
        OutputFormat::Json => {
            let report = StatsReport {
                parse: &parsed.stats,
                conversion: summarize(&result),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
