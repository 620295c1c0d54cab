//! Normalized target model produced by the converter.
//!
//! Rules and groups refer to objects by name. Names are final once the
//! converter's last renaming pass has run.

use serde::Serialize;

use screenos_core::{ConversionIncident, Severity};

/// Marker set on a zone group whose interfaces lead to the internet.
pub const DEFAULT_GATEWAY_MARKER: &str = "DefaultGateway";
/// Marker set on interface and zone groups that carry a NAT interface.
pub const NAT_MARKER: &str = "NAT";
/// Name of the any object in rules.
pub const ANY: &str = "any";

/// Object-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ObjectKind {
    Host { ip: String },
    Network { subnet: String, netmask: String },
    Range { first: String, last: String },
    Domain { fqdn: String },
    Zone,
    TcpService { port: String, timeout: u32 },
    UdpService { port: String, timeout: u32 },
    OtherService { protocol: String, timeout: u32 },
    IcmpService { icmp_type: u8, code: u8 },
    RpcService { program: String },
    DceRpcService { uuid: String },
    NetworkGroup { members: Vec<String> },
    ServiceGroup { members: Vec<String> },
}

impl ObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Host { .. } => "host",
            ObjectKind::Network { .. } => "network",
            ObjectKind::Range { .. } => "range",
            ObjectKind::Domain { .. } => "domain",
            ObjectKind::Zone => "zone",
            ObjectKind::TcpService { .. } => "tcp-service",
            ObjectKind::UdpService { .. } => "udp-service",
            ObjectKind::OtherService { .. } => "other-service",
            ObjectKind::IcmpService { .. } => "icmp-service",
            ObjectKind::RpcService { .. } => "rpc-service",
            ObjectKind::DceRpcService { .. } => "dcerpc-service",
            ObjectKind::NetworkGroup { .. } => "network-group",
            ObjectKind::ServiceGroup { .. } => "service-group",
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(
            self,
            ObjectKind::TcpService { .. }
                | ObjectKind::UdpService { .. }
                | ObjectKind::OtherService { .. }
                | ObjectKind::IcmpService { .. }
                | ObjectKind::RpcService { .. }
                | ObjectKind::DceRpcService { .. }
                | ObjectKind::ServiceGroup { .. }
        )
    }

    pub fn members(&self) -> Option<&[String]> {
        match self {
            ObjectKind::NetworkGroup { members } | ObjectKind::ServiceGroup { members } => {
                Some(members)
            }
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            ObjectKind::NetworkGroup { members } | ObjectKind::ServiceGroup { members } => {
                Some(members)
            }
            _ => None,
        }
    }
}

/// One emitted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedObject {
    pub name: String,
    #[serde(flatten)]
    pub kind: ObjectKind,
    /// Zone the source object was declared in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub line_id: usize,
    pub incident: Severity,
}

impl NormalizedObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            zone: None,
            markers: Vec::new(),
            comment: String::new(),
            line_id: 0,
            incident: Severity::None,
        }
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.zone = Some(zone.to_string());
        self
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }

    pub fn add_marker(&mut self, marker: &str) {
        if !self.has_marker(marker) {
            self.markers.push(marker.to_string());
        }
    }

    pub fn add_member(&mut self, member: &str) {
        if let Some(members) = self.kind.members_mut() {
            members.push(member.to_string());
        }
    }

    pub fn members(&self) -> &[String] {
        self.kind.members().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RuleAction {
    Accept,
    #[default]
    Drop,
    Reject,
    SubPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Track {
    #[default]
    None,
    Log,
}

/// Access rule in a parent or sub-policy layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub layer: String,
    pub source: Vec<String>,
    pub destination: Vec<String>,
    pub service: Vec<String>,
    pub source_negated: bool,
    pub destination_negated: bool,
    pub action: RuleAction,
    /// Layer selected by a [`RuleAction::SubPolicy`] rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_policy: Option<String>,
    pub track: Track,
    pub enabled: bool,
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub line_id: usize,
    pub incident: Severity,
}

impl Rule {
    pub fn new(name: impl Into<String>, layer: &str) -> Self {
        Self {
            name: name.into(),
            layer: layer.to_string(),
            source: Vec::new(),
            destination: Vec::new(),
            service: Vec::new(),
            source_negated: false,
            destination_negated: false,
            action: RuleAction::Drop,
            sub_policy: None,
            track: Track::None,
            enabled: true,
            tag: String::new(),
            comment: String::new(),
            line_id: 0,
            incident: Severity::None,
        }
    }

    /// Selector rule in the parent layer jumping to `sub_policy`.
    pub fn sub_policy(layer: &str, source: &str, destination: &str, sub_policy: &str) -> Self {
        let mut rule = Rule::new(sub_policy, layer);
        rule.source.push(source.to_string());
        rule.destination.push(destination.to_string());
        rule.service.push(ANY.to_string());
        rule.action = RuleAction::SubPolicy;
        rule.sub_policy = Some(sub_policy.to_string());
        rule
    }

    /// Trailing any/any/any rule of a layer.
    pub fn cleanup(name: &str, layer: &str, action: RuleAction, comment: &str) -> Self {
        let mut rule = Rule::new(name, layer);
        rule.source.push(ANY.to_string());
        rule.destination.push(ANY.to_string());
        rule.service.push(ANY.to_string());
        rule.action = action;
        rule.comment = comment.to_string();
        rule
    }

    pub fn references(&self, name: &str) -> bool {
        self.source
            .iter()
            .chain(&self.destination)
            .chain(&self.service)
            .any(|n| n == name)
    }
}

/// Ordered rule container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Index just before the trailing cleanup rule.
    pub fn before_cleanup(&self) -> usize {
        self.rules.len().max(1) - 1
    }
}

/// Parent layer plus the sub-policy layers its selector rules jump to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub parent_layer: Layer,
    pub sub_policies: Vec<Layer>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent_layer: Layer::new(name),
            sub_policies: Vec::new(),
        }
    }

    pub fn sub_policy(&self, name: &str) -> Option<&Layer> {
        self.sub_policies.iter().find(|l| l.name == name)
    }

    pub fn sub_policy_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.sub_policies.iter_mut().find(|l| l.name == name)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.parent_layer
            .rules
            .iter()
            .chain(self.sub_policies.iter().flat_map(|l| l.rules.iter()))
    }

    pub fn rules_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.parent_layer
            .rules
            .iter_mut()
            .chain(self.sub_policies.iter_mut().flat_map(|l| l.rules.iter_mut()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NatMethod {
    Static,
    Hide,
}

/// Address translation rule. `None` on an original field means any, on a
/// translated field means unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NatRule {
    pub method: NatMethod,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub service: Option<String>,
    pub translated_source: Option<String>,
    pub translated_destination: Option<String>,
    pub translated_service: Option<String>,
    pub enabled: bool,
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub line_id: usize,
}

impl NatRule {
    pub fn new(method: NatMethod, tag: &str, line_id: usize) -> Self {
        Self {
            method,
            source: None,
            destination: None,
            service: None,
            translated_source: None,
            translated_destination: None,
            translated_service: None,
            enabled: true,
            tag: tag.to_string(),
            comment: String::new(),
            line_id,
        }
    }

    pub fn fields_mut(&mut self) -> [&mut Option<String>; 6] {
        [
            &mut self.source,
            &mut self.destination,
            &mut self.service,
            &mut self.translated_source,
            &mut self.translated_destination,
            &mut self.translated_service,
        ]
    }

    pub fn references(&self, name: &str) -> bool {
        [
            &self.source,
            &self.destination,
            &self.service,
            &self.translated_source,
            &self.translated_destination,
            &self.translated_service,
        ]
        .into_iter()
        .any(|f| f.as_deref() == Some(name))
    }
}

/// Incidents raised on one configuration line, deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineIncidents {
    pub line_id: usize,
    pub incidents: Vec<ConversionIncident>,
}

/// Everything one conversion run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub objects: Vec<NormalizedObject>,
    pub package: Package,
    pub nat_rules: Vec<NatRule>,
    pub incidents: Vec<ConversionIncident>,
    /// Lines of NAT statements left out because NAT conversion was off.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_nat_lines: Vec<usize>,
}

impl ConversionResult {
    pub fn object(&self, name: &str) -> Option<&NormalizedObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Incidents grouped by line in line order, without repeated
    /// title/description pairs.
    pub fn incidents_by_line(&self) -> Vec<LineIncidents> {
        let mut lines: Vec<LineIncidents> = Vec::new();
        let mut sorted: Vec<&ConversionIncident> = self.incidents.iter().collect();
        sorted.sort_by_key(|i| i.line_id);
        for incident in sorted {
            match lines.last_mut() {
                Some(group) if group.line_id == incident.line_id => {
                    if !group.incidents.contains(incident) {
                        group.incidents.push(incident.clone());
                    }
                }
                _ => lines.push(LineIncidents {
                    line_id: incident.line_id,
                    incidents: vec![incident.clone()],
                }),
            }
        }
        lines
    }

    pub fn has_manual_action(&self) -> bool {
        self.incidents
            .iter()
            .any(|i| i.severity == Severity::ManualActionRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_cleanup_index() {
        let mut layer = Layer::new("l");
        assert_eq!(layer.before_cleanup(), 0);
        layer
            .rules
            .push(Rule::cleanup("c", "l", RuleAction::Drop, ""));
        assert_eq!(layer.before_cleanup(), 0);
        layer
            .rules
            .insert(0, Rule::cleanup("a", "l", RuleAction::Accept, ""));
        assert_eq!(layer.before_cleanup(), 1);
    }

    #[test]
    fn incidents_group_by_line_and_dedupe() {
        let inc = |line, title: &str| ConversionIncident::new(line, title, "d", Severity::Informative);
        let result = ConversionResult {
            objects: Vec::new(),
            package: Package::new("p"),
            nat_rules: Vec::new(),
            incidents: vec![inc(7, "a"), inc(3, "b"), inc(7, "a"), inc(7, "c")],
            skipped_nat_lines: Vec::new(),
        };
        let grouped = result.incidents_by_line();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].line_id, 3);
        let titles: Vec<&str> = grouped[1].incidents.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[test]
    fn group_members_and_markers() {
        let mut group = NormalizedObject::new("g", ObjectKind::NetworkGroup { members: vec![] });
        group.add_member("a");
        group.add_marker(NAT_MARKER);
        group.add_marker(NAT_MARKER);
        assert_eq!(group.members(), ["a"]);
        assert_eq!(group.markers, vec![NAT_MARKER]);

        let mut host = NormalizedObject::new("h", ObjectKind::Host { ip: "1.1.1.1".into() });
        host.add_member("ignored");
        assert!(host.members().is_empty());
    }
}
