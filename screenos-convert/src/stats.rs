//! Post-conversion statistics.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{ConversionResult, ObjectKind, Rule, RuleAction, Track, ANY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub objects: usize,
    pub hosts: usize,
    pub networks: usize,
    pub ranges: usize,
    pub domains: usize,
    pub zones: usize,
    pub services: usize,
    pub groups: usize,
    pub rules: usize,
    pub disabled_rules: usize,
    pub unlogged_rules: usize,
    pub any_rules: usize,
    pub cleanup_rules: usize,
    pub layers: usize,
    pub nat_rules: usize,
    pub incident_lines: usize,
    pub incident_titles: usize,
    pub manual_actions: usize,
}

pub fn summarize(result: &ConversionResult) -> ConversionStats {
    let objects = &result.objects;
    let count = |pred: fn(&ObjectKind) -> bool| objects.iter().filter(|o| pred(&o.kind)).count();

    let access: Vec<&Rule> = result
        .package
        .rules()
        .filter(|r| r.action != RuleAction::SubPolicy && !is_cleanup(r))
        .collect();

    let lines: BTreeSet<usize> = result.incidents.iter().map(|i| i.line_id).collect();
    let titles: BTreeSet<&str> = result.incidents.iter().map(|i| i.title.as_str()).collect();

    ConversionStats {
        objects: objects.len(),
        hosts: count(|k| matches!(k, ObjectKind::Host { .. })),
        networks: count(|k| matches!(k, ObjectKind::Network { .. })),
        ranges: count(|k| matches!(k, ObjectKind::Range { .. })),
        domains: count(|k| matches!(k, ObjectKind::Domain { .. })),
        zones: count(|k| matches!(k, ObjectKind::Zone)),
        services: count(|k| k.is_service() && k.members().is_none()),
        groups: count(|k| k.members().is_some()),
        rules: access.len(),
        disabled_rules: access.iter().filter(|r| !r.enabled).count(),
        unlogged_rules: access.iter().filter(|r| r.track == Track::None).count(),
        any_rules: access.iter().filter(|r| uses_any(r)).count(),
        cleanup_rules: result.package.rules().filter(|r| is_cleanup(r)).count(),
        layers: 1 + result.package.sub_policies.len(),
        nat_rules: result.nat_rules.len(),
        incident_lines: lines.len(),
        incident_titles: titles.len(),
        manual_actions: result
            .incidents_by_line()
            .iter()
            .flat_map(|l| &l.incidents)
            .filter(|i| i.severity == screenos_core::Severity::ManualActionRequired)
            .count(),
    }
}

/// Emitted objects per kind label.
pub fn objects_by_kind(result: &ConversionResult) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for object in &result.objects {
        *counts.entry(object.kind.label()).or_insert(0) += 1;
    }
    counts
}

fn is_cleanup(rule: &Rule) -> bool {
    rule.name.ends_with("Cleanup rule")
}

fn uses_any(rule: &Rule) -> bool {
    [&rule.source, &rule.destination, &rule.service]
        .into_iter()
        .any(|refs| refs.iter().any(|r| r == ANY))
}

pub fn render(stats: ConversionStats) -> String {
    format!(
        "convert_summary objects={} hosts={} networks={} ranges={} domains={} zones={} services={} groups={} rules={} disabled={} unlogged={} any={} cleanup={} layers={} nat_rules={} incident_lines={} incident_titles={} manual_actions={}",
        stats.objects,
        stats.hosts,
        stats.networks,
        stats.ranges,
        stats.domains,
        stats.zones,
        stats.services,
        stats.groups,
        stats.rules,
        stats.disabled_rules,
        stats.unlogged_rules,
        stats.any_rules,
        stats.cleanup_rules,
        stats.layers,
        stats.nat_rules,
        stats.incident_lines,
        stats.incident_titles,
        stats.manual_actions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NatMethod, NatRule, NormalizedObject, Package};
    use screenos_core::{ConversionIncident, Severity};

    fn sample() -> ConversionResult {
        let mut package = Package::new("p");
        let mut rule = Rule::new("r1", "p");
        rule.source.push("a".into());
        rule.destination.push(ANY.into());
        rule.service.push("http".into());
        rule.enabled = false;
        package.parent_layer.rules.push(rule);
        package.parent_layer.rules.push(Rule::sub_policy("p", "Trust", "Trust", "Trust_sub_policy"));
        package
            .parent_layer
            .rules
            .push(Rule::cleanup("Cleanup rule", "p", RuleAction::Drop, ""));
        ConversionResult {
            objects: vec![
                NormalizedObject::new("a", ObjectKind::Host { ip: "1.1.1.1".into() }),
                NormalizedObject::new("Trust", ObjectKind::Zone),
                NormalizedObject::new(
                    "svc",
                    ObjectKind::TcpService {
                        port: "81".into(),
                        timeout: 0,
                    },
                ),
                NormalizedObject::new("g", ObjectKind::ServiceGroup { members: vec![] }),
            ],
            package,
            nat_rules: vec![NatRule::new(NatMethod::Hide, "DIP", 4)],
            incidents: vec![
                ConversionIncident::new(4, "t1", "d", Severity::ManualActionRequired),
                ConversionIncident::new(4, "t1", "d", Severity::ManualActionRequired),
                ConversionIncident::new(7, "t2", "d", Severity::Informative),
            ],
            skipped_nat_lines: Vec::new(),
        }
    }

    #[test]
    fn counts_objects_rules_and_incidents() {
        let stats = summarize(&sample());
        assert_eq!(stats.objects, 4);
        assert_eq!(stats.hosts, 1);
        assert_eq!(stats.zones, 1);
        assert_eq!(stats.services, 1);
        assert_eq!(stats.groups, 1);
        assert_eq!(stats.rules, 1);
        assert_eq!(stats.disabled_rules, 1);
        assert_eq!(stats.unlogged_rules, 1);
        assert_eq!(stats.any_rules, 1);
        assert_eq!(stats.cleanup_rules, 1);
        assert_eq!(stats.nat_rules, 1);
        assert_eq!(stats.incident_lines, 2);
        assert_eq!(stats.incident_titles, 2);
        assert_eq!(stats.manual_actions, 1);
    }

    #[test]
    fn render_is_one_line() {
        let line = render(summarize(&sample()));
        assert!(line.starts_with("convert_summary objects=4 hosts=1"));
        assert!(line.contains("nat_rules=1"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn kinds_are_counted_by_label() {
        let counts = objects_by_kind(&sample());
        assert_eq!(counts.get("host"), Some(&1));
        assert_eq!(counts.get("service-group"), Some(&1));
    }
}
