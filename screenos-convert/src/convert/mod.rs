//! ScreenOS to normalized policy model conversion.
//!
//! [`convert`] walks the aggregated command sequence of a [`ParsedConfig`]
//! and emits objects, a zone-based policy package and NAT rules. Every
//! converted element keeps the line id of the statement it came from, and
//! every lossy decision is recorded as a [`ConversionIncident`].
//!
//! ## Stages
//!
//! 1. **Predefined names**: target predefined services and reserved names
//!    are registered so nothing new can take them
//! 2. **Objects**: zones, addresses, address groups, ip pools
//! 3. **Services**: services and service groups
//! 4. **Interfaces**: interface groups, interface networks, zone groups
//! 5. **Policies**: parent layer, intra-zone, inter-zone and global rules
//! 6. **NAT**: MIP, VIP, DIP, policy-based and legacy interface NAT
//! 7. **Names**: domain renaming and unsafe character cleanup
//!
//! ## Dummies
//!
//! A reference to something that does not exist is replaced by a
//! placeholder object named after the offending line, and a manual action
//! incident points at it. The conversion itself never fails.

mod nat;
mod objects;
mod policy;
mod services;

use std::collections::{BTreeSet, HashMap};

use log::{debug, info};
use screenos_core::parsers::{GLOBAL_ZONE, SPECIAL_ZONES};
use screenos_core::{Command, ConversionIncident, ParsedConfig, Severity};

use crate::knowledge::KnowledgeBase;
use crate::model::{ConversionResult, NatRule, NormalizedObject, ObjectKind, Package, Rule};
use crate::naming::{self, Claim, NameRegistry};
use crate::store::ObjectStore;

const EMPTY_NAME_TITLE: &str = "Object name cannot be empty. Please review for further possible modifications to objects before migration.";
const PREDEFINED_NAME_TITLE: &str = "Detected an object with a same name in the target's predefined objects repository. Please review for further possible modifications to objects before migration.";
const DUPLICATE_NAME_TITLE: &str = "Detected an object with a non unique name. Target names are case insensitive. Please review for further possible modifications to objects before migration.";
const UNKNOWN_ZONE_TITLE: &str = "ScreenOS command using unknown zone. Ignoring this command";
const DOMAIN_TITLE: &str = "ScreenOS Domain object is converted to target Domain object using dns-name prefixed with a dot as converted object name.";
const UNSAFE_NAME_TITLE: &str = "Object name contains characters the target does not accept. Replacing them with underscores.";

/// Knobs of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Convert NAT policies and interface NAT definitions.
    pub include_nat: bool,
    /// Name of the policy package and of its parent layer.
    pub package_name: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_nat: true,
            package_name: "SSG_policy_package".to_string(),
        }
    }
}

/// Placeholder shapes created for unresolved references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dummy {
    Network,
    Service,
}

/// Convert a parsed configuration.
///
/// # Arguments
///
/// * `parsed` - Output of [`screenos_core::parse`]
/// * `knowledge` - Predefined-service tables
/// * `options` - NAT toggle and package name
///
/// # Returns
///
/// The converted objects, policy package, NAT rules and incidents.
pub fn convert(
    parsed: &ParsedConfig,
    knowledge: &KnowledgeBase,
    options: &ConvertOptions,
) -> ConversionResult {
    let mut converter = Converter::new(parsed, knowledge, options);
    converter.register_predefined();
    converter.upload_predefined_services();

    converter.add_zones();
    converter.add_addresses();
    converter.add_ip_pools();
    debug!("converted {} address objects", converter.store.len());

    converter.add_services();
    converter.add_service_groups();

    converter.add_interfaces();
    converter.add_zone_groups();

    converter.add_policies();

    if options.include_nat {
        converter.add_mip_nat();
        converter.add_vip_nat();
        converter.add_dip_nat();
        converter.add_policy_dest_nat();
        converter.add_policy_src_dest_nat();
        converter.add_legacy_nat();
        converter.merge_nat_policy_rules();
    } else {
        converter.mark_nat_lines();
    }

    converter.enforce_name_validity();
    let result = converter.finish();
    info!(
        "converted {} objects, {} rules, {} nat rules, {} incidents",
        result.objects.len(),
        result.package.rules().count(),
        result.nat_rules.len(),
        result.incidents.len()
    );
    result
}

/// Mutable state shared by the conversion stages.
struct Converter<'a> {
    parsed: &'a ParsedConfig,
    knowledge: &'a KnowledgeBase,
    store: ObjectStore,
    names: NameRegistry,
    incidents: Vec<ConversionIncident>,
    /// Severity raised on a line by the converter itself.
    raised: HashMap<usize, Severity>,
    /// ScreenOS service name to converted service or group name.
    services: HashMap<String, String>,
    /// Zone name to its zone group, in first-seen order.
    zone_groups: Vec<(String, NormalizedObject)>,
    blocked_zones: BTreeSet<String>,
    /// Objects whose name is declared in several zones, renamed last.
    deferred: Vec<(NormalizedObject, &'a Command)>,
    package: Package,
    nat_rules: Vec<NatRule>,
    /// Access rules derived from NAT policies, merged after NAT.
    nat_policy_rules: Vec<Rule>,
    skipped_nat_lines: Vec<usize>,
}

impl<'a> Converter<'a> {
    fn new(
        parsed: &'a ParsedConfig,
        knowledge: &'a KnowledgeBase,
        options: &ConvertOptions,
    ) -> Self {
        Self {
            parsed,
            knowledge,
            store: ObjectStore::default(),
            names: NameRegistry::default(),
            incidents: Vec::new(),
            raised: HashMap::new(),
            services: HashMap::new(),
            zone_groups: Vec::new(),
            blocked_zones: BTreeSet::new(),
            deferred: Vec::new(),
            package: Package::new(&options.package_name),
            nat_rules: Vec::new(),
            nat_policy_rules: Vec::new(),
            skipped_nat_lines: Vec::new(),
        }
    }

    fn register_predefined(&mut self) {
        let knowledge = self.knowledge;
        let names: BTreeSet<&str> = knowledge
            .reserved_names()
            .chain(knowledge.target_services().iter().map(|s| s.name.as_str()))
            .chain(knowledge.group_mappings().iter().map(|m| m.target.as_str()))
            .collect();
        for name in names {
            self.store.add_predefined(name);
            self.names.register_predefined(name);
        }
    }

    fn finish(self) -> ConversionResult {
        ConversionResult {
            objects: self.store.into_objects(),
            package: self.package,
            nat_rules: self.nat_rules,
            incidents: self.incidents,
            skipped_nat_lines: self.skipped_nat_lines,
        }
    }

    /// Record an incident and raise the severity of its line.
    fn note(
        &mut self,
        line_id: usize,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) {
        let raised = self.raised.entry(line_id).or_default();
        *raised = (*raised).max(severity);
        self.incidents
            .push(ConversionIncident::new(line_id, title, description, severity));
    }

    fn severity_of(&self, cmd: &Command) -> Severity {
        self.raised
            .get(&cmd.id)
            .copied()
            .unwrap_or_default()
            .max(cmd.incident)
    }

    /// Tie `object` to `cmd` and carry the command's incident over.
    fn apply_incident(&mut self, object: &mut NormalizedObject, cmd: &Command) {
        object.line_id = cmd.id;
        let severity = self.severity_of(cmd);
        if severity == Severity::None {
            return;
        }
        object.incident = object.incident.max(severity);
        if !cmd.incident_message.is_empty() {
            self.note(
                cmd.id,
                cmd.incident_message.clone(),
                format!("{} details: {}.", kind_label(cmd), cmd.text),
                severity,
            );
        }
    }

    /// Like [`Self::apply_incident`] for a head and its children, where
    /// the head message may hold several newline-separated entries.
    fn apply_nested_incident(&mut self, object: &mut NormalizedObject, cmd: &Command) {
        object.line_id = cmd.id;
        let severity = self.severity_of(cmd);
        if severity != Severity::None {
            object.incident = object.incident.max(severity);
            for message in cmd.incident_message.split('\n').filter(|m| !m.is_empty()) {
                self.note(
                    cmd.id,
                    message,
                    format!("{} details: {}.", kind_label(cmd), cmd.text),
                    severity,
                );
            }
        }
        for child in &cmd.children {
            let severity = self.severity_of(child);
            if severity == Severity::None || child.incident_message.is_empty() {
                continue;
            }
            object.incident = object.incident.max(severity);
            for message in child.incident_message.split('\n').filter(|m| !m.is_empty()) {
                self.note(
                    child.id,
                    message,
                    format!("{} details: {}.", kind_label(cmd), child.text),
                    severity,
                );
            }
        }
    }

    /// Make `object.name` unique, renaming it when the name was already
    /// handed out or belongs to a target predefined object.
    fn check_name(&mut self, object: &mut NormalizedObject, cmd: Option<&Command>) {
        let (line_id, text) = cmd.map_or((0, ""), |c| (c.id, c.text.as_str()));
        if object.name.is_empty() {
            object.incident = Severity::ManualActionRequired;
            self.note(
                line_id,
                EMPTY_NAME_TITLE,
                format!("ScreenOS command: {text}."),
                Severity::ManualActionRequired,
            );
            return;
        }
        if let Claim::Renamed { unique, predefined } = self.names.claim(&object.name) {
            let title = if predefined {
                PREDEFINED_NAME_TITLE
            } else {
                DUPLICATE_NAME_TITLE
            };
            self.note(
                line_id,
                title,
                format!("Original name: {}. Using unique name: {}.", object.name, unique),
                Severity::ManualActionRequired,
            );
            object.incident = Severity::ManualActionRequired;
            object.name = unique;
        }
    }

    /// Name of an existing object, or of a placeholder created in its place.
    fn lookup_or_dummy(
        &mut self,
        name: &str,
        shape: Dummy,
        cmd: &Command,
        title: &str,
        description: &str,
    ) -> String {
        if self.store.contains(name) {
            return name.to_string();
        }
        let id = cmd.id;
        let (dummy_name, kind) = match shape {
            Dummy::Network => (
                format!("_Err_in_topology-line_{id}"),
                ObjectKind::NetworkGroup {
                    members: Vec::new(),
                },
            ),
            Dummy::Service => (
                format!("_Err_in_service-line_{id}"),
                ObjectKind::ServiceGroup {
                    members: Vec::new(),
                },
            ),
        };
        let mut dummy = NormalizedObject::new(dummy_name.as_str(), kind);
        dummy.line_id = id;
        dummy.incident = Severity::ManualActionRequired;
        if self.store.add(dummy) {
            debug!("line {id}: placeholder {dummy_name} stands in for {name}");
        }
        self.note(
            id,
            title,
            format!("{description} Using dummy object: {dummy_name}."),
            Severity::ManualActionRequired,
        );
        dummy_name
    }

    fn is_zone_object(&self, name: &str) -> bool {
        self.store
            .get(name)
            .is_some_and(|o| o.kind == ObjectKind::Zone)
    }

    /// True when `zone` can be referenced. Special zones are created on
    /// first use; any other unknown zone drops the command.
    fn is_zone_available(&mut self, zone: &str, cmd: &Command) -> bool {
        if zone == GLOBAL_ZONE || self.is_zone_object(zone) {
            return true;
        }
        if SPECIAL_ZONES.contains(&zone) {
            let mut object = NormalizedObject::new(zone, ObjectKind::Zone);
            self.apply_incident(&mut object, cmd);
            self.check_name(&mut object, Some(cmd));
            self.store.add(object);
            return true;
        }
        self.note(
            cmd.id,
            UNKNOWN_ZONE_TITLE,
            format!("Object details: {}.", cmd.text),
            Severity::Informative,
        );
        false
    }

    /// Rename an object and patch groups, rules and NAT rules.
    fn rename_everywhere(&mut self, old: &str, new: &str, zone: Option<&str>) -> bool {
        if !self.store.rename(old, new, zone) {
            return false;
        }
        self.replace_rule_references(old, new);
        true
    }

    fn replace_rule_references(&mut self, old: &str, new: &str) {
        for rule in self.package.rules_mut() {
            for name in rule
                .source
                .iter_mut()
                .chain(rule.destination.iter_mut())
                .chain(rule.service.iter_mut())
            {
                if name == old {
                    *name = new.to_string();
                }
            }
        }
        for nat in &mut self.nat_rules {
            for field in nat.fields_mut() {
                if field.as_deref() == Some(old) {
                    *field = Some(new.to_string());
                }
            }
        }
    }

    /// Final naming pass: domains take their dotted FQDN as name, then
    /// every remaining unsafe character is replaced.
    fn enforce_name_validity(&mut self) {
        let domains: Vec<(String, String, Option<String>)> = self
            .store
            .iter()
            .filter_map(|o| match &o.kind {
                ObjectKind::Domain { fqdn } => Some((o.name.clone(), fqdn.clone(), o.zone.clone())),
                _ => None,
            })
            .collect();
        for (name, fqdn, zone) in domains {
            let dotted = naming::domain(&fqdn);
            if dotted != name && self.store.contains(&dotted) {
                debug!("domain {name} merged into {dotted}");
                self.store.remove(&name);
                self.store.replace_member(&name, &dotted, zone.as_deref());
                self.replace_rule_references(&name, &dotted);
            } else if dotted != name {
                self.rename_everywhere(&name, &dotted, zone.as_deref());
            }
            if let Some(object) = self.store.get_mut(&dotted) {
                object.incident = object.incident.max(Severity::Informative);
            }
        }

        let unsafe_names: Vec<(String, usize)> = self
            .store
            .iter()
            .filter(|o| !naming::is_safe_name(&o.name))
            .map(|o| (o.name.clone(), o.line_id))
            .collect();
        for (name, line_id) in unsafe_names {
            let cleaned = naming::safe_name(&name);
            let cleaned = match self.names.claim(&cleaned) {
                Claim::Unique => cleaned,
                Claim::Renamed { unique, .. } => unique,
            };
            if self.rename_everywhere(&name, &cleaned, None) {
                if let Some(object) = self.store.get_mut(&cleaned) {
                    object.incident = object.incident.max(Severity::Informative);
                }
                self.note(
                    line_id,
                    UNSAFE_NAME_TITLE,
                    format!("Original name: {name}. Using name: {cleaned}."),
                    Severity::Informative,
                );
            }
        }
    }
}

/// Label used in incident descriptions for a command.
fn kind_label(cmd: &Command) -> &'static str {
    match cmd.kind_name() {
        "" => "command",
        name => name,
    }
}

/// `"name"` without its quotes.
fn unquote(text: &str) -> String {
    text.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::default_knowledge;

    fn run(text: &str) -> ConversionResult {
        let parsed = screenos_core::parse(text).expect("parse");
        convert(&parsed, &default_knowledge(), &ConvertOptions::default())
    }

    #[test]
    fn empty_config_has_cleanup_rule_only() {
        let result = run("set hostname fw\n");
        assert!(result.objects.is_empty());
        let parent = &result.package.parent_layer;
        assert_eq!(parent.rules.len(), 1);
        assert_eq!(parent.rules[0].name, "Cleanup rule");
        assert_eq!(parent.rules[0].comment, "default-permit-all Disabled");
    }

    #[test]
    fn duplicate_names_are_renamed() {
        let result = run(concat!(
            "set zone \"Trust\" vrouter \"trust-vr\"\n",
            "set address \"Trust\" \"srv\" 10.0.0.1 255.255.255.255\n",
            "set address \"Trust\" \"SRV\" 10.0.0.2 255.255.255.255\n",
        ));
        assert!(result.object("srv").is_some());
        let renamed = result.object("SRV_1").expect("renamed");
        assert_eq!(renamed.incident, Severity::ManualActionRequired);
        assert!(result
            .incidents
            .iter()
            .any(|i| i.line_id == 3 && i.description.contains("Using unique name: SRV_1")));
    }

    #[test]
    fn unknown_zone_drops_address() {
        let result = run("set address \"Nowhere\" \"srv\" 10.0.0.1 255.255.255.255\n");
        assert!(result.object("srv").is_none());
        assert_eq!(result.incidents[0].title, UNKNOWN_ZONE_TITLE);
        assert_eq!(result.incidents[0].severity, Severity::Informative);
    }

    #[test]
    fn special_zone_is_created_on_use() {
        let result = run("set address \"V1-Trust\" \"srv\" 10.0.0.1 255.255.255.255\n");
        assert_eq!(
            result.object("V1-Trust").map(|o| &o.kind),
            Some(&ObjectKind::Zone)
        );
        assert!(result.object("srv").is_some());
    }

    #[test]
    fn unsafe_characters_are_replaced_everywhere() {
        let result = run(concat!(
            "set zone \"Trust\" vrouter \"trust-vr\"\n",
            "set address \"Trust\" \"a/b\" 10.0.0.1 255.255.255.255\n",
            "set group address \"Trust\" \"g\"\n",
            "set group address \"Trust\" \"g\" add \"a/b\"\n",
        ));
        assert!(result.object("a/b").is_none());
        assert!(result.object("a_b").is_some());
        assert_eq!(result.object("g").expect("group").members(), ["a_b"]);
    }

    #[test]
    fn repeated_names_count_up_and_groups_follow() {
        let result = run(concat!(
            "set zone \"Trust\" vrouter \"trust-vr\"\n",
            "set address \"Trust\" \"web\" 10.0.0.1 255.255.255.255\n",
            "set address \"Trust\" \"WEB\" 10.0.0.2 255.255.255.255\n",
            "set group service \"Web\"\n",
            "set group service \"Web\" add \"HTTP\"\n",
            "set group service \"all-web\"\n",
            "set group service \"all-web\" add \"Web\"\n",
        ));
        assert!(result.object("web").is_some());
        assert!(result.object("WEB_1").is_some());
        let renamed = result.object("Web_2").expect("third copy renamed");
        assert_eq!(renamed.members(), ["http"]);
        assert_eq!(
            result.object("all-web").expect("outer group").members(),
            ["Web_2"]
        );

        let renames: Vec<_> = result
            .incidents
            .iter()
            .filter(|i| i.title == DUPLICATE_NAME_TITLE)
            .map(|i| (i.line_id, i.description.as_str()))
            .collect();
        assert_eq!(
            renames,
            [
                (3, "Original name: WEB. Using unique name: WEB_1."),
                (4, "Original name: Web. Using unique name: Web_2."),
            ]
        );
    }

    #[test]
    fn mip_destination_wins_over_nat_clause() {
        let result = run(concat!(
            "set zone \"Trust\" vrouter \"trust-vr\"\n",
            "set zone \"Untrust\" vrouter \"trust-vr\"\n",
            "set interface \"ethernet0/0\" zone \"Untrust\"\n",
            "set interface ethernet0/0 ip 203.0.113.1/24\n",
            "set interface \"ethernet0/0\" dip 4 203.0.113.30 203.0.113.30\n",
            "set interface \"ethernet0/0\" mip 203.0.113.10 host 10.1.1.10 netmask 255.255.255.255 vr \"trust-vr\"\n",
            "set policy id 2 from \"Untrust\" to \"Trust\"  \"Any\" \"MIP(203.0.113.10)\" \"HTTP\" nat src dip-id 4 permit\n",
            "set policy id 2\n",
            "exit\n",
        ));
        assert!(!result.nat_rules.is_empty());
        assert!(result.nat_rules.iter().all(|r| r.tag == "MIP"));
        let mixed: Vec<_> = result
            .incidents
            .iter()
            .filter(|i| i.title.starts_with("Complex ScreenOS NAT policy"))
            .collect();
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].line_id, 7);
        assert_eq!(
            mixed[0].title,
            "Complex ScreenOS NAT policy is not supported, only MIP NAT will be considered"
        );
        assert_eq!(mixed[0].severity, Severity::Informative);
        assert!(result.object("SM_HOST_DIP_4").is_none());
    }
}
