//! Parsed configuration statements.
//!
//! A [`Command`] carries the fields every statement shares (line id, raw
//! text, flags, incident state, owned children) plus a [`CommandKind`]
//! payload holding the kind-specific fields filled by the per-kind parsers.
//!
//! ## Lifecycle
//!
//! Commands are created once by the classifier, may be moved under a head
//! command by the aggregator and are read-only afterwards.

use serde::Serialize;

use crate::incident::Severity;
use crate::netutil;
use crate::protocol::ServiceProtocol;
use crate::tokenizer::Tokens;

/// Aggregation state of a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ProcessingState {
    #[default]
    Unprocessed,
    Aggregated,
}

/// One configuration statement.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// 1-based physical line number.
    pub id: usize,
    pub text: String,
    #[serde(skip)]
    pub tokens: Tokens,
    pub known: bool,
    /// Statement is out of scope for conversion.
    pub skip: bool,
    pub state: ProcessingState,
    pub incident: Severity,
    pub incident_message: String,
    pub comment: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Command>,
    pub kind: CommandKind,
}

impl Command {
    /// Build an unparsed command for one line.
    pub fn new(id: usize, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            tokens: Tokens::new(text),
            known: false,
            skip: false,
            state: ProcessingState::Unprocessed,
            incident: Severity::None,
            incident_message: String::new(),
            comment: String::new(),
            children: Vec::new(),
            kind: CommandKind::Generic,
        }
    }

    pub fn object_word(&self) -> String {
        self.tokens.object_word()
    }

    /// Raise an incident on this command, replacing any previous message.
    pub fn set_incident(&mut self, severity: Severity, message: impl Into<String>) {
        self.incident = severity;
        self.incident_message = message.into();
    }

    /// Display name of the statement kind.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_aggregated(&self) -> bool {
        self.state == ProcessingState::Aggregated
    }

    pub fn as_address(&self) -> Option<&Address> {
        match &self.kind {
            CommandKind::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_group_address(&self) -> Option<&GroupAddress> {
        match &self.kind {
            CommandKind::GroupAddress(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match &self.kind {
            CommandKind::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group_service(&self) -> Option<&GroupService> {
        match &self.kind {
            CommandKind::GroupService(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_zone(&self) -> Option<&Zone> {
        match &self.kind {
            CommandKind::Zone(z) => Some(z),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&Interface> {
        match &self.kind {
            CommandKind::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&Route> {
        match &self.kind {
            CommandKind::Route(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&Policy> {
        match &self.kind {
            CommandKind::Policy(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_group_dip(&self) -> Option<&GroupNatDip> {
        match &self.kind {
            CommandKind::GroupNatDip(g) => Some(g),
            _ => None,
        }
    }

    /// True when `network` falls inside a subnet directly owned by this
    /// interface or by one of its IP-typed children.
    pub fn interface_owns_network(&self, network: &str) -> bool {
        if self.skip {
            return false;
        }
        let Some(ifc) = self.as_interface() else {
            return false;
        };
        if ifc.sub_type == InterfaceType::Ip
            && netutil::network_of(&ifc.ip, &ifc.mask) == netutil::network_of(network, &ifc.mask)
        {
            return true;
        }
        self.children
            .iter()
            .any(|child| child.interface_owns_network(network))
    }
}

/// Kind-specific payload of a [`Command`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CommandKind {
    Generic,
    Address(Address),
    GroupAddress(GroupAddress),
    Service(Service),
    GroupService(GroupService),
    IpPool(IpPool),
    Zone(Zone),
    Interface(Interface),
    Route(Route),
    Policy(Policy),
    GroupNatDip(GroupNatDip),
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Generic => "",
            CommandKind::Address(_) => "address",
            CommandKind::GroupAddress(_) => "group address",
            CommandKind::Service(_) => "service",
            CommandKind::GroupService(_) => "group service",
            CommandKind::IpPool(_) => "ippool",
            CommandKind::Zone(_) => "zone",
            CommandKind::Interface(_) => "interface",
            CommandKind::Route(_) => "route",
            CommandKind::Policy(_) => "policy",
            CommandKind::GroupNatDip(_) => "dip group",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AddressType {
    #[default]
    Na,
    Host,
    Network,
    Domain,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Address {
    pub zone: String,
    pub name: String,
    pub address_type: AddressType,
    pub ip: String,
    pub netmask: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupAddress {
    pub zone: String,
    pub group: String,
    /// Member added by a continuation line; empty on the head declaration.
    pub member: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TimeoutUnit {
    #[default]
    Minutes,
    TenSeconds,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Service {
    pub name: String,
    /// Line names a service inside a policy body rather than defining one.
    pub policy_context: bool,
    pub protocol: Option<ServiceProtocol>,
    pub session_cache: bool,
    pub timeout: u32,
    pub timeout_unit: TimeoutUnit,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupService {
    pub group: String,
    pub member: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IpPool {
    pub name: String,
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Zone {
    pub name: String,
    pub id: Option<i64>,
    pub predefined: bool,
    pub vrouter: String,
    pub blocked: bool,
    pub policy_context: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum InterfaceType {
    #[default]
    Na,
    Ip,
    Zone,
    Nat,
    Dip,
    Mip,
    Vip,
}

/// A route-derived subnet reachable through an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subnet {
    pub network: String,
    pub mask: String,
    /// Line id of the originating route.
    pub route_id: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Interface {
    pub name: String,
    pub sub_type: InterfaceType,
    pub ip: String,
    pub mask: String,
    pub secondary: bool,
    pub zone: String,
    pub topology: Vec<Subnet>,
    pub leads_to_internet: bool,
    pub nat: Option<InterfaceNat>,
}

/// NAT definition attached to an interface line.
#[derive(Debug, Clone, Serialize)]
pub enum InterfaceNat {
    Dip(InterfaceNatDip),
    Mip(InterfaceNatMip),
    Vip(InterfaceNatVip),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InterfaceNatDip {
    pub dip_id: u32,
    pub ip_start: String,
    pub ip_end: String,
    pub shift_from: String,
    pat: bool,
}

impl InterfaceNatDip {
    pub fn new() -> Self {
        Self {
            pat: true,
            ..Self::default()
        }
    }

    /// Port translation is disabled by `fix-port` and by shifted ranges.
    pub fn pat(&self) -> bool {
        self.shift_from.is_empty() && self.pat
    }

    pub fn set_pat(&mut self, pat: bool) {
        self.pat = pat;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InterfaceNatMip {
    pub mip: String,
    pub ip: String,
    pub mask: String,
    pub vr_name: String,
}

impl InterfaceNatMip {
    /// Name used by policies to reference this MIP, e.g. `MIP(1.1.1.0/24)`.
    pub fn reference_name(&self) -> String {
        let len = netutil::mask_length(&self.mask);
        if len == 32 {
            format!("MIP({})", self.mip)
        } else {
            format!("MIP({}/{})", self.mip, len)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VipData {
    pub src_port: u32,
    pub dest_service_name: String,
    pub dest_ip: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InterfaceNatVip {
    pub vip: String,
    pub use_interface_ip: bool,
    pub data: Option<VipData>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupNatDip {
    pub group_id: u32,
    /// Member dip id added by a continuation line; 0 on the head declaration.
    pub member: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Route {
    pub network: String,
    pub mask: String,
    pub interface: String,
    pub gateway: String,
    pub description: String,
    pub metric: Option<u32>,
    pub permanent: bool,
}

impl Route {
    pub fn is_default_route(&self) -> bool {
        netutil::mask_length(&self.mask) == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PolicyAction {
    #[default]
    Na,
    Permit,
    Reject,
    Deny,
}

/// NAT shape of a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum PolicyNatType {
    Na,
    #[default]
    Policy,
    Vip,
    Mip,
    Dip,
    PolicyBaseDest,
    PolicyBaseSrcDest,
}

impl PolicyNatType {
    /// Classify a destination object by the MIP/VIP naming convention.
    pub fn from_destination(dst: &str) -> Self {
        let dst = dst.trim_matches('"');
        if dst == "Any" {
            return PolicyNatType::Policy;
        }
        if dst.starts_with("MIP(") {
            PolicyNatType::Mip
        } else if dst.starts_with("VIP(") {
            PolicyNatType::Vip
        } else {
            PolicyNatType::Policy
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Policy {
    pub id: u32,
    pub name: String,
    pub src_zone: String,
    pub dst_zone: String,
    pub src_object: String,
    pub dst_object: String,
    pub service: String,
    pub action: PolicyAction,
    pub log: bool,
    pub disabled: bool,
    pub global: bool,
    pub default_permit_all: bool,
    pub nat_type: PolicyNatType,
    pub dip_id: u32,
    pub dest_nat_ips: Vec<String>,
    pub dest_nat_port: u32,
    /// Both a MIP/VIP destination and an explicit `nat` clause were present.
    pub mixed_nat: bool,
}
