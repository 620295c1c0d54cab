use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use screenos_convert::convert::{convert, ConvertOptions};
use screenos_convert::knowledge::{default_knowledge, load_knowledge, KnowledgeBase};
use screenos_convert::model::ConversionResult;
use screenos_convert::report::{render_incidents, render_package, render_summary};
use screenos_core::{parse_file, Severity};

use crate::cli::{ConvertArgs, OutputFormat};
use crate::path_guard::ensure_output_not_input;

pub fn run_convert(args: ConvertArgs) -> Result<()> {
    if let Some(output) = &args.output {
        ensure_output_not_input(output, &args.file)?;
    }

    let parsed = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let knowledge = knowledge_base(args.knowledge.as_deref())?;

    let mut options = ConvertOptions {
        include_nat: !args.no_nat,
        ..ConvertOptions::default()
    };
    if let Some(name) = args.package_name {
        options.package_name = name;
    }

    let result = convert(&parsed, &knowledge, &options);
    if !result.skipped_nat_lines.is_empty() {
        warn!(
            "{} NAT statements left unconverted",
            result.skipped_nat_lines.len()
        );
    }

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&result)?;
        fs::write(output, json)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!("wrote conversion result to {}", output.display());
    }

    match args.format {
        OutputFormat::Text => println!("{}", render_text(&result, args.rules)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if args.strict && result.has_manual_action() {
        let lines = result
            .incidents_by_line()
            .into_iter()
            .filter(|l| {
                l.incidents
                    .iter()
                    .any(|i| i.severity == Severity::ManualActionRequired)
            })
            .count();
        bail!("conversion needs manual action on {lines} line(s)");
    }

    Ok(())
}

pub(crate) fn knowledge_base(path: Option<&Path>) -> Result<KnowledgeBase> {
    match path {
        Some(path) => load_knowledge(path)
            .with_context(|| format!("failed to load knowledge {}", path.display())),
        None => Ok(default_knowledge()),
    }
}

fn render_text(result: &ConversionResult, rules: bool) -> String {
    let mut out = Vec::new();
    if rules {
        out.push(render_package(result));
    }
    let incidents = render_incidents(result);
    if !incidents.is_empty() {
        out.push(incidents);
    }
    out.push(render_summary(result));
    out.join("\n")
}
