use colored::Colorize;
use screenos_core::{Command, ParseStats, Severity};

use crate::model::{ConversionResult, NatRule, Rule, RuleAction};
use crate::stats::{objects_by_kind, render, summarize};

/// Render incidents grouped by configuration line.
pub fn render_incidents(result: &ConversionResult) -> String {
    let mut out = Vec::new();
    for group in result.incidents_by_line() {
        out.push(format!("line {}", group.line_id).bold().to_string());
        for incident in &group.incidents {
            let label = match incident.severity {
                Severity::ManualActionRequired => "MANUAL".red().to_string(),
                Severity::Informative => "INFO".yellow().to_string(),
                Severity::None => "NOTE".to_string(),
            };
            out.push(format!("  {label} {}", incident.title));
            if !incident.description.is_empty() {
                out.push(format!("    {}", incident.description));
            }
        }
    }
    out.join("\n")
}

/// Render the one-line conversion summary.
pub fn render_summary(result: &ConversionResult) -> String {
    render(summarize(result)).cyan().to_string()
}

/// Render the policy package layer by layer.
pub fn render_package(result: &ConversionResult) -> String {
    let package = &result.package;
    let mut out = vec![format!("package {}", package.name)];
    out.push(format!("layer {}", package.parent_layer.name));
    out.extend(package.parent_layer.rules.iter().map(render_rule));
    for layer in &package.sub_policies {
        out.push(format!("layer {}", layer.name));
        out.extend(layer.rules.iter().map(render_rule));
    }
    if !result.nat_rules.is_empty() {
        out.push("nat".to_string());
        out.extend(result.nat_rules.iter().map(render_nat_rule));
    }
    out.join("\n")
}

fn render_rule(rule: &Rule) -> String {
    let action = match rule.action {
        RuleAction::Accept => "accept".green().to_string(),
        RuleAction::Drop => "drop".red().to_string(),
        RuleAction::Reject => "reject".red().to_string(),
        RuleAction::SubPolicy => format!("-> {}", rule.sub_policy.as_deref().unwrap_or("")),
    };
    let mut line = format!(
        "- {} src={}{} dst={}{} svc={} {action}",
        rule.name,
        negation(rule.source_negated),
        rule.source.join(","),
        negation(rule.destination_negated),
        rule.destination.join(","),
        rule.service.join(","),
    );
    if !rule.enabled {
        line.push_str(" (disabled)");
    }
    line
}

fn negation(negated: bool) -> &'static str {
    if negated {
        "!"
    } else {
        ""
    }
}

fn render_nat_rule(rule: &NatRule) -> String {
    let field = |f: &Option<String>| f.clone().unwrap_or_else(|| "*".to_string());
    format!(
        "- line={} {:?} {} {} {} => {} {} {}{}",
        rule.line_id,
        rule.method,
        field(&rule.source),
        field(&rule.destination),
        field(&rule.service),
        field(&rule.translated_source),
        field(&rule.translated_destination),
        field(&rule.translated_service),
        if rule.enabled { "" } else { " (disabled)" }
    )
}

/// Render commands with their aggregated children indented below them.
pub fn render_commands(commands: &[Command]) -> String {
    let mut out = Vec::new();
    for cmd in commands {
        push_command(&mut out, cmd, 0);
    }
    out.join("\n")
}

fn push_command(out: &mut Vec<String>, cmd: &Command, depth: usize) {
    let indent = "  ".repeat(depth);
    let kind = match cmd.kind_name() {
        "" => "-",
        name => name,
    };
    let mut line = format!("{indent}{:>5} [{kind}] {}", cmd.id, cmd.text);
    if cmd.skip {
        line = line.dimmed().to_string();
    } else if !cmd.known {
        line = line.yellow().to_string();
    }
    out.push(line);
    if cmd.incident != Severity::None {
        out.push(format!(
            "{indent}      {} {}",
            cmd.incident.label().red(),
            cmd.incident_message
        ));
    }
    for child in &cmd.children {
        push_command(out, child, depth + 1);
    }
}

/// Render parse counters and per-kind statement counts.
pub fn render_parse_stats(stats: &ParseStats) -> String {
    let mut out = vec![format!(
        "parse_summary lines={} statements={} known={} unknown={} skipped={}",
        stats.lines, stats.statements, stats.known, stats.unknown, stats.skipped
    )
    .cyan()
    .to_string()];
    for (kind, counts) in &stats.by_kind {
        out.push(format!(
            "- {kind}: total={} skipped={}",
            counts.total, counts.skipped
        ));
    }
    out.join("\n")
}

/// Render emitted object counts per kind.
pub fn render_object_counts(result: &ConversionResult) -> String {
    let mut out = vec!["object_summary".to_string()];
    for (kind, count) in objects_by_kind(result) {
        out.push(format!("- {kind}: {count}"));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Package;
    use screenos_core::ConversionIncident;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn incidents_render_under_their_line() {
        plain();
        let result = ConversionResult {
            objects: Vec::new(),
            package: Package::new("p"),
            nat_rules: Vec::new(),
            incidents: vec![
                ConversionIncident::new(9, "missing", "a dummy was created", Severity::ManualActionRequired),
                ConversionIncident::new(2, "renamed", "", Severity::Informative),
            ],
            skipped_nat_lines: Vec::new(),
        };
        let text = render_incidents(&result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "line 2",
                "  INFO renamed",
                "line 9",
                "  MANUAL missing",
                "    a dummy was created"
            ]
        );
    }

    #[test]
    fn children_are_indented() {
        plain();
        let parsed = screenos_core::parse(
            "set service \"web\" protocol tcp src-port 0-65535 dst-port 80-80\nset service \"web\" + tcp src-port 0-65535 dst-port 443-443\n",
        )
        .unwrap();
        let text = render_commands(&parsed.processed);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[service]"));
        assert!(lines[1].starts_with("  "));
        assert!(lines[1].contains("443-443"));
    }
}
