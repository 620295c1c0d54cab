//! Zone-based policy package.
//!
//! ScreenOS policies are grouped by zone pair. The parent layer holds one
//! selector rule per zone pair jumping to a sub-policy layer, global
//! policies, and the cleanup rule. Every sub-policy layer ends with its own
//! cleanup rule.
//!
//! ## Directions
//!
//! - **Intra**: source and destination zone are the same
//! - **Inter**: zones differ
//! - **Global**: `set policy global`, copied into every layer

use log::debug;
use screenos_core::{Command, PolicyAction, PolicyNatType, Severity};

use super::{unquote, Converter, Dummy};
use crate::model::{Layer, Rule, RuleAction, Track, ANY};
use crate::naming;

pub(super) const CLEANUP_RULE: &str = "Cleanup rule";
pub(super) const SUB_POLICY_CLEANUP_RULE: &str = "Sub-Policy Cleanup rule";
const INTRA_TAG: &str = "intra";
const INTER_TAG: &str = "inter";
const GLOBAL_TAG: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
    Intra,
    Inter,
    Global,
}

/// Flattened view of a policy head and its body lines.
#[derive(Debug, Clone)]
pub(super) struct PolicyView<'a> {
    pub cmd: &'a Command,
    pub id: u32,
    pub name: String,
    pub from: String,
    pub to: String,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub services: Vec<String>,
    pub sources_negated: bool,
    pub destinations_negated: bool,
    pub action: PolicyAction,
    pub log: bool,
    pub enabled: bool,
    pub global: bool,
    pub nat_type: PolicyNatType,
    /// Incident carried into the converted rule; NAT stages may override it.
    pub incident: Severity,
    pub incident_message: String,
}

impl<'a> PolicyView<'a> {
    /// View of a numbered policy head, or `None` for anything else.
    pub fn from_command(cmd: &'a Command) -> Option<Self> {
        let policy = cmd.as_policy()?;
        if policy.id == 0 || cmd.skip {
            return None;
        }
        let mut view = PolicyView {
            cmd,
            id: policy.id,
            name: policy.name.clone(),
            from: unquote(&policy.src_zone),
            to: unquote(&policy.dst_zone),
            sources: vec![unquote(&policy.src_object)],
            destinations: vec![unquote(&policy.dst_object)],
            services: vec![unquote(&policy.service)],
            sources_negated: false,
            destinations_negated: false,
            action: policy.action,
            log: policy.log,
            enabled: !policy.disabled,
            global: policy.global,
            nat_type: policy.nat_type,
            incident: cmd.incident,
            incident_message: cmd.incident_message.clone(),
        };
        for child in cmd.children.iter().filter(|c| !c.skip) {
            if child.as_policy().is_some_and(|p| p.disabled) {
                view.enabled = false;
                continue;
            }
            let value = child.tokens.token_at(2);
            match child.object_word().as_str() {
                "src-address" if value == "negate" => view.sources_negated = true,
                "src-address" => view.sources.push(unquote(value)),
                "dst-address" if value == "negate" => view.destinations_negated = true,
                "dst-address" => view.destinations.push(unquote(value)),
                "service" => view.services.push(unquote(value)),
                _ => {}
            }
        }
        Some(view)
    }

    pub fn direction(&self) -> Direction {
        if self.global {
            Direction::Global
        } else if self.from == self.to {
            Direction::Intra
        } else {
            Direction::Inter
        }
    }

    /// Name of the sub-policy layer this policy lands in.
    pub fn layer(&self) -> String {
        naming::sub_policy(&self.from, &self.to)
    }
}

impl<'a> Converter<'a> {
    /// Views of all numbered, converted policies of one NAT shape.
    pub(super) fn policy_views(&self, nat_type: PolicyNatType) -> Vec<PolicyView<'a>> {
        let parsed = self.parsed;
        parsed
            .processed
            .iter()
            .filter_map(PolicyView::from_command)
            .filter(|v| v.nat_type == nat_type)
            .collect()
    }

    fn default_permit_all(&self) -> bool {
        self.parsed
            .processed
            .iter()
            .filter_map(Command::as_policy)
            .any(|p| p.default_permit_all)
    }

    fn zone_names(&self) -> Vec<String> {
        self.store
            .iter()
            .filter(|o| o.kind == crate::model::ObjectKind::Zone)
            .map(|o| o.name.clone())
            .collect()
    }

    pub(super) fn add_policies(&mut self) {
        let views = self.policy_views(PolicyNatType::Policy);
        debug!("converting {} regular policies", views.len());
        self.add_parent_layer(&views);
        self.add_intra_layers(&views);
        self.add_inter_layers(&views);
        self.add_global_rules(&views);
    }

    fn add_parent_layer(&mut self, views: &[PolicyView<'a>]) {
        let package = self.package.name.clone();
        let mut intra: Vec<String> = Vec::new();
        let mut inter: Vec<(String, String)> = Vec::new();
        for view in views {
            match view.direction() {
                Direction::Intra if !intra.contains(&view.from) => intra.push(view.from.clone()),
                Direction::Inter => {
                    let pair = (view.from.clone(), view.to.clone());
                    if !inter.contains(&pair) {
                        inter.push(pair);
                    }
                }
                _ => {}
            }
        }

        let mut rules = Vec::new();
        for zone in &intra {
            if self.store.contains(zone) {
                rules.push(selector(&package, zone, zone, INTRA_TAG));
            }
        }
        for zone in self.zone_names() {
            if !intra.contains(&zone) {
                rules.push(selector(&package, &zone, &zone, INTRA_TAG));
            }
        }
        for (from, to) in &inter {
            if self.store.contains(from) && self.store.contains(to) {
                rules.push(selector(&package, from, to, INTER_TAG));
            }
        }

        let (action, comment) = self.default_permit_action();
        let mut cleanup = Rule::cleanup(CLEANUP_RULE, &package, action, comment);
        cleanup.tag = GLOBAL_TAG.to_string();
        rules.push(cleanup);
        self.package.parent_layer.rules = rules;
    }

    fn default_permit_action(&self) -> (RuleAction, &'static str) {
        if self.default_permit_all() {
            (RuleAction::Accept, "default-permit-all Enabled")
        } else {
            (RuleAction::Drop, "default-permit-all Disabled")
        }
    }

    fn add_intra_layers(&mut self, views: &[PolicyView<'a>]) {
        let mut layers: Vec<(String, Layer)> = Vec::new();
        for view in views.iter().filter(|v| v.direction() == Direction::Intra) {
            if !self.is_zone_available(&view.from, view.cmd) {
                continue;
            }
            let name = view.layer();
            let rule = self.create_rule(view, &name);
            match layers.iter_mut().find(|(zone, _)| *zone == view.from) {
                Some((_, layer)) => layer.rules.push(rule),
                None => {
                    let mut layer = Layer::new(name);
                    layer.rules.push(rule);
                    layers.push((view.from.clone(), layer));
                }
            }
        }
        for zone in self.zone_names() {
            if !layers.iter().any(|(z, _)| *z == zone) {
                let layer = Layer::new(naming::sub_policy(&zone, &zone));
                layers.push((zone, layer));
            }
        }
        for (zone, mut layer) in layers {
            let cleanup = if self.blocked_zones.contains(&zone) {
                Rule::cleanup(
                    SUB_POLICY_CLEANUP_RULE,
                    &layer.name,
                    RuleAction::Drop,
                    "Intra Zone Blocking Enabled",
                )
            } else {
                Rule::cleanup(
                    SUB_POLICY_CLEANUP_RULE,
                    &layer.name,
                    RuleAction::Accept,
                    "Intra Zone Blocking Disabled",
                )
            };
            layer.rules.push(cleanup);
            self.package.sub_policies.push(layer);
        }
    }

    fn add_inter_layers(&mut self, views: &[PolicyView<'a>]) {
        let mut layers: Vec<Layer> = Vec::new();
        for view in views.iter().filter(|v| v.direction() == Direction::Inter) {
            if !self.is_zone_available(&view.from, view.cmd)
                || !self.is_zone_available(&view.to, view.cmd)
            {
                continue;
            }
            let name = view.layer();
            let rule = self.create_rule(view, &name);
            match layers.iter_mut().find(|l| l.name == name) {
                Some(layer) => layer.rules.push(rule),
                None => {
                    let mut layer = Layer::new(name);
                    layer.rules.push(rule);
                    layers.push(layer);
                }
            }
        }
        let (action, comment) = self.default_permit_action();
        for mut layer in layers {
            let cleanup = Rule::cleanup(SUB_POLICY_CLEANUP_RULE, &layer.name, action, comment);
            layer.rules.push(cleanup);
            self.package.sub_policies.push(layer);
        }
    }

    /// Global rules go before the cleanup rule of the parent layer and of
    /// every sub-policy layer.
    fn add_global_rules(&mut self, views: &[PolicyView<'a>]) {
        let package = self.package.name.clone();
        for view in views.iter().filter(|v| v.direction() == Direction::Global) {
            let mut rule = self.create_rule(view, &package);
            rule.name = format!("Global_Rule {}", view.id);
            rule.tag = GLOBAL_TAG.to_string();

            let parent = &mut self.package.parent_layer;
            let at = parent.before_cleanup();
            parent.rules.insert(at, rule.clone());
            for layer in &mut self.package.sub_policies {
                let mut copy = rule.clone();
                copy.layer = layer.name.clone();
                let at = layer.before_cleanup();
                layer.rules.insert(at, copy);
            }
        }
    }

    /// Access rule for one policy in `layer`.
    pub(super) fn create_rule(&mut self, view: &PolicyView<'a>, layer: &str) -> Rule {
        let name = if view.name.is_empty() {
            format!("Rule{}", view.id)
        } else {
            view.name.clone()
        };
        let mut rule = Rule::new(name, layer);
        rule.enabled = view.enabled;
        rule.tag = format!("{} {}", view.from, view.to);
        rule.track = if view.log { Track::Log } else { Track::None };
        rule.action = match view.action {
            PolicyAction::Permit => RuleAction::Accept,
            PolicyAction::Reject => RuleAction::Reject,
            PolicyAction::Deny | PolicyAction::Na => RuleAction::Drop,
        };
        rule.source_negated = view.sources_negated;
        rule.destination_negated = view.destinations_negated;
        rule.line_id = view.cmd.id;

        let severity = view.incident.max(self.severity_of(view.cmd));
        if severity != Severity::None {
            rule.incident = severity;
            if !view.incident_message.is_empty() {
                self.note(
                    view.cmd.id,
                    view.incident_message.clone(),
                    format!("policy details: {}.", view.cmd.text),
                    severity,
                );
            }
        }

        for source in &view.sources {
            let resolved = self.source_reference(source, view, false);
            rule.source.push(resolved);
        }
        for destination in &view.destinations {
            let resolved = self.destination_reference(destination, view, false);
            rule.destination.push(resolved);
        }
        for service in &view.services {
            let resolved = self.service_reference(service, view);
            rule.service.push(resolved);
        }
        rule.incident = rule.incident.max(self.severity_of(view.cmd));
        rule
    }

    /// Resolve a policy source. For NAT rules `Any` narrows to the source
    /// zone group unless that zone leads to the internet.
    pub(super) fn source_reference(&mut self, name: &str, view: &PolicyView<'a>, nat: bool) -> String {
        if name.eq_ignore_ascii_case("any") {
            return if nat {
                self.nat_zone_group(&view.from)
            } else {
                ANY.to_string()
            };
        }
        let name = self.zone_qualified(name, &view.from);
        self.lookup_or_dummy(
            &name,
            Dummy::Network,
            view.cmd,
            "Error creating a rule, missing information for source ScreenOS object",
            &format!("Source object details: {name}."),
        )
    }

    pub(super) fn destination_reference(
        &mut self,
        name: &str,
        view: &PolicyView<'a>,
        nat: bool,
    ) -> String {
        if name.eq_ignore_ascii_case("any") {
            return if nat {
                self.nat_zone_group(&view.to)
            } else {
                ANY.to_string()
            };
        }
        let name = self.zone_qualified(name, &view.to);
        self.lookup_or_dummy(
            &name,
            Dummy::Network,
            view.cmd,
            "Error creating a rule, missing information for destination ScreenOS object",
            &format!("Object details: {name}."),
        )
    }

    pub(super) fn service_reference(&mut self, name: &str, view: &PolicyView<'a>) -> String {
        if name.eq_ignore_ascii_case("any") {
            return ANY.to_string();
        }
        let converted = match self.services.get(name) {
            Some(converted) => converted.clone(),
            None => self.predefined_service_or_group(name),
        };
        self.lookup_or_dummy(
            &converted,
            Dummy::Service,
            view.cmd,
            "Error creating a rule, missing information for service ScreenOS object",
            &format!("Object details: {name}."),
        )
    }

    fn zone_qualified(&self, name: &str, zone: &str) -> String {
        if self.parsed.is_name_multi_zone(name) {
            format!("{name}_{zone}")
        } else {
            name.to_string()
        }
    }

    fn nat_zone_group(&self, zone: &str) -> String {
        let group = naming::zone_group(zone);
        match self.store.get(&group) {
            Some(object) if !object.has_marker(crate::model::DEFAULT_GATEWAY_MARKER) => group,
            _ => ANY.to_string(),
        }
    }

    /// Queue the access rule of a NAT policy.
    pub(super) fn rule_from_nat_policy(&mut self, view: &PolicyView<'a>) {
        if !self.is_zone_available(&view.from, view.cmd)
            || !self.is_zone_available(&view.to, view.cmd)
        {
            return;
        }
        let rule = self.create_rule(view, &view.layer());
        self.nat_policy_rules.push(rule);
    }

    /// Place the access rules of NAT policies. A rule whose layer does not
    /// exist yet gets a new layer and a selector before the first global
    /// rule of the parent layer.
    pub(super) fn merge_nat_policy_rules(&mut self) {
        let package = self.package.name.clone();
        for rule in std::mem::take(&mut self.nat_policy_rules) {
            if let Some(layer) = self.package.sub_policy_mut(&rule.layer) {
                layer.rules.insert(0, rule);
                continue;
            }
            let Some((from, to)) = rule.tag.split_once(' ') else {
                continue;
            };
            if !self.store.contains(from) || !self.store.contains(to) {
                continue;
            }
            let parent = &mut self.package.parent_layer;
            let first_global = parent
                .rules
                .iter()
                .position(|r| r.tag == GLOBAL_TAG)
                .unwrap_or(parent.rules.len());
            parent
                .rules
                .insert(first_global, selector(&package, from, to, INTER_TAG));

            let mut layer = Layer::new(rule.layer.clone());
            layer.rules.push(rule);
            for inherited in &parent.rules[first_global + 1..] {
                let mut copy = inherited.clone();
                copy.layer = layer.name.clone();
                layer.rules.push(copy);
            }
            if let Some(last) = layer.rules.last_mut() {
                last.name = SUB_POLICY_CLEANUP_RULE.to_string();
            }
            let at = first_global.min(self.package.sub_policies.len());
            self.package.sub_policies.insert(at, layer);
        }
    }
}

fn selector(package: &str, from: &str, to: &str, tag: &str) -> Rule {
    let mut rule = Rule::sub_policy(package, from, to, &naming::sub_policy(from, to));
    rule.tag = tag.to_string();
    rule
}

#[cfg(test)]
mod tests {
    use crate::convert::{convert, ConvertOptions};
    use crate::knowledge::default_knowledge;
    use crate::model::{ConversionResult, RuleAction, Track};
    use screenos_core::Severity;

    fn run(text: &str) -> ConversionResult {
        let parsed = screenos_core::parse(text).expect("parse");
        convert(&parsed, &default_knowledge(), &ConvertOptions::default())
    }

    const BASE: &str = concat!(
        "set zone \"Trust\" vrouter \"trust-vr\"\n",
        "set zone \"Untrust\" vrouter \"trust-vr\"\n",
        "set address \"Trust\" \"clients\" 10.1.1.0 255.255.255.0\n",
    );

    #[test]
    fn inter_zone_policy_gets_selector_and_layer() {
        let text = format!(
            "{BASE}{}",
            concat!(
                "set policy id 1 from \"Trust\" to \"Untrust\"  \"clients\" \"Any\" \"HTTP\" permit log\n",
                "set policy id 1\n",
                "exit\n",
            )
        );
        let result = run(&text);
        let parent = &result.package.parent_layer;
        let names: Vec<&str> = parent.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Trust_sub_policy",
                "Untrust_sub_policy",
                "Trust_to_Untrust_sub_policy",
                "Cleanup rule"
            ]
        );
        let layer = result
            .package
            .sub_policy("Trust_to_Untrust_sub_policy")
            .expect("layer");
        let rule = &layer.rules[0];
        assert_eq!(rule.name, "Rule1");
        assert_eq!(rule.source, vec!["clients"]);
        assert_eq!(rule.destination, vec!["any"]);
        assert_eq!(rule.service, vec!["http"]);
        assert_eq!(rule.action, RuleAction::Accept);
        assert_eq!(rule.track, Track::Log);
        assert_eq!(layer.rules[1].name, "Sub-Policy Cleanup rule");
        assert_eq!(layer.rules[1].action, RuleAction::Drop);
    }

    #[test]
    fn body_lines_extend_and_disable_the_rule() {
        let text = format!(
            "{BASE}{}",
            concat!(
                "set address \"Trust\" \"more\" 10.1.2.0 255.255.255.0\n",
                "set policy id 3 from \"Trust\" to \"Trust\"  \"clients\" \"Any\" \"ANY\" deny\n",
                "set policy id 3 disable\n",
                "set policy id 3\n",
                "set src-address \"more\"\n",
                "set dst-address negate\n",
                "exit\n",
            )
        );
        let result = run(&text);
        let layer = result.package.sub_policy("Trust_sub_policy").expect("layer");
        let rule = &layer.rules[0];
        assert_eq!(rule.source, vec!["clients", "more"]);
        assert!(rule.destination_negated);
        assert!(!rule.enabled);
        assert_eq!(rule.action, RuleAction::Drop);
    }

    #[test]
    fn missing_references_become_dummies() {
        let text = format!(
            "{BASE}{}",
            concat!(
                "set policy id 9 from \"Trust\" to \"Untrust\"  \"clients\" \"ghost\" \"nope\" reject\n",
                "set policy id 9\n",
                "exit\n",
            )
        );
        let result = run(&text);
        let layer = result
            .package
            .sub_policy("Trust_to_Untrust_sub_policy")
            .expect("layer");
        let rule = &layer.rules[0];
        assert_eq!(rule.destination, vec!["_Err_in_topology-line_4"]);
        assert_eq!(rule.service, vec!["_Err_in_service-line_4"]);
        assert_eq!(rule.incident, Severity::ManualActionRequired);
        assert!(result.has_manual_action());
    }

    #[test]
    fn global_rules_are_copied_into_every_layer() {
        let text = format!(
            "{BASE}{}",
            concat!(
                "set policy global id 8 from \"Global\" to \"Global\"  \"Any\" \"Any\" \"PING\" permit\n",
                "set policy id 8\n",
                "exit\n",
                "set policy default-permit-all\n",
            )
        );
        let result = run(&text);
        let parent = &result.package.parent_layer;
        let last_two: Vec<&str> = parent.rules[parent.rules.len() - 2..]
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(last_two, vec!["Global_Rule 8", "Cleanup rule"]);
        assert_eq!(parent.rules.last().map(|r| r.action), Some(RuleAction::Accept));
        for layer in &result.package.sub_policies {
            let n = layer.rules.len();
            assert_eq!(layer.rules[n - 2].name, "Global_Rule 8");
            assert_eq!(layer.rules[n - 2].layer, layer.name);
        }
    }
}
