//! Service protocol sub-objects.
//!
//! A `set service` line carries one protocol clause. Each clause parser
//! starts at the index of the protocol keyword, consumes its fixed layout and
//! returns the next free index so the service parser can continue with the
//! trailing options without knowing the clause internals.
//!
//! ## Port keys
//!
//! [`ServiceProtocol::port_key`] produces the `<PROTO>_<value>` key used for
//! predefined-service lookups (`TCP_80`, `ICMP_8_0`, `SUN-RPC_100003`, ...).

use serde::Serialize;

use crate::tokenizer::Tokens;

const SUN_RPC_MIN_PROGRAM: u64 = 100_000;
const SUN_RPC_MAX_PROGRAM: u64 = 1_410_065_407;

const SOURCE_PORT_MESSAGE: &str = "ScreenOS service object with source port other then Any will not be considered during migration. Target service objects do not support source ports";
const PORT_ZERO_MESSAGE: &str = "ScreenOS service object with destination port 0 is not valid in the target system. Modifying port to 1";
const SUN_RPC_RANGE_MESSAGE: &str = "ScreenOS SUN-RPC service object with program range is not supported in the target system. Using only first program number in range";

/// Protocol clause of a service line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "protocol")]
pub enum ServiceProtocol {
    Ip(PortProtocol),
    Tcp(PortProtocol),
    Udp(PortProtocol),
    Icmp(IcmpProtocol),
    MsRpc(MsRpcProtocol),
    SunRpc(SunRpcProtocol),
}

impl ServiceProtocol {
    /// Parse the clause whose keyword sits at `base`.
    ///
    /// Returns `None` when the keyword names no supported protocol.
    pub fn parse(tokens: &Tokens, base: usize) -> Option<(ServiceProtocol, usize)> {
        let keyword = tokens.token_at(base);
        let parsed = match keyword {
            "tcp" => {
                let (mut p, next) = PortProtocol::parse(tokens, base);
                p.transport_messages();
                (ServiceProtocol::Tcp(p), next)
            }
            "udp" => {
                let (mut p, next) = PortProtocol::parse(tokens, base);
                p.transport_messages();
                (ServiceProtocol::Udp(p), next)
            }
            "icmp" => {
                let (p, next) = IcmpProtocol::parse(tokens, base);
                (ServiceProtocol::Icmp(p), next)
            }
            "ms-rpc" => {
                let (p, next) = MsRpcProtocol::parse(tokens, base);
                (ServiceProtocol::MsRpc(p), next)
            }
            "sun-rpc" => {
                let (p, next) = SunRpcProtocol::parse(tokens, base);
                (ServiceProtocol::SunRpc(p), next)
            }
            other if other.parse::<u32>().is_ok() => {
                let (p, next) = PortProtocol::parse(tokens, base);
                (ServiceProtocol::Ip(p), next)
            }
            _ => return None,
        };
        Some(parsed)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ServiceProtocol::Ip(_) => "ip",
            ServiceProtocol::Tcp(_) => "tcp",
            ServiceProtocol::Udp(_) => "udp",
            ServiceProtocol::Icmp(_) => "icmp",
            ServiceProtocol::MsRpc(_) => "ms-rpc",
            ServiceProtocol::SunRpc(_) => "sun-rpc",
        }
    }

    /// Fragment used when naming converted service objects.
    pub fn name_fragment(&self) -> String {
        match self {
            ServiceProtocol::Ip(p) => format!("ip_{}", p.protocol),
            ServiceProtocol::Tcp(p) => format!("tcp_{}_{}", p.src_port(), p.dst_port()),
            ServiceProtocol::Udp(p) => format!("udp_{}_{}", p.src_port(), p.dst_port()),
            ServiceProtocol::Icmp(p) => format!("icmp_T{}_C{}", p.icmp_type, p.icmp_code),
            ServiceProtocol::MsRpc(p) => format!("ms-rpc_U{}", p.uuid),
            ServiceProtocol::SunRpc(p) => format!("sun-rpc_P{}", p.program()),
        }
    }

    /// Key used for predefined-service lookups.
    pub fn port_key(&self) -> String {
        match self {
            ServiceProtocol::Ip(p) => format!("OTHER_{}", p.protocol),
            ServiceProtocol::Tcp(p) => format!("TCP_{}", p.dst_port()),
            ServiceProtocol::Udp(p) => format!("UDP_{}", p.dst_port()),
            ServiceProtocol::Icmp(p) => {
                if p.icmp_code != 0 {
                    self.name_fragment()
                } else {
                    format!("ICMP_{}_{}", p.icmp_type, p.icmp_code)
                }
            }
            ServiceProtocol::MsRpc(p) => format!("MS-RPC_{}", p.uuid),
            ServiceProtocol::SunRpc(p) => format!("SUN-RPC_{}", p.program()),
        }
    }

    pub fn incident_message(&self) -> &str {
        match self {
            ServiceProtocol::Ip(p) | ServiceProtocol::Tcp(p) | ServiceProtocol::Udp(p) => {
                &p.incident_message
            }
            ServiceProtocol::Icmp(p) => &p.incident_message,
            ServiceProtocol::MsRpc(p) => &p.incident_message,
            ServiceProtocol::SunRpc(p) => &p.incident_message,
        }
    }
}

/// Layout shared by ip, tcp and udp clauses:
/// `<proto> [src-port a-b] [dst-port a-b]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortProtocol {
    /// Protocol keyword or IP protocol number.
    pub protocol: String,
    src_start: u32,
    src_end: u32,
    dst_start: u32,
    dst_end: u32,
    pub incident_message: String,
}

impl Default for PortProtocol {
    fn default() -> Self {
        Self {
            protocol: String::new(),
            src_start: 0,
            src_end: 65535,
            dst_start: 0,
            dst_end: 65535,
            incident_message: String::new(),
        }
    }
}

impl PortProtocol {
    fn parse(tokens: &Tokens, base: usize) -> (Self, usize) {
        let mut p = PortProtocol {
            protocol: tokens.token_at(base).to_string(),
            ..Self::default()
        };
        let base = base + 1;
        if tokens.token_at(base) == "src-port" {
            if let Some((start, end)) = parse_range(tokens.token_at(base + 1)) {
                p.src_start = start;
                p.src_end = end;
            }
        }
        if tokens.token_at(base + 2) == "dst-port" {
            if let Some((start, end)) = parse_range(tokens.token_at(base + 3)) {
                p.dst_start = start;
                p.dst_end = end;
            }
        }
        (p, base + 4)
    }

    fn transport_messages(&mut self) {
        let mut messages = Vec::new();
        if self.src_port() != "any" {
            messages.push(SOURCE_PORT_MESSAGE);
        }
        if self.dst_start == 0 {
            messages.push(PORT_ZERO_MESSAGE);
        }
        self.incident_message = messages.join("\n");
    }

    fn bound(value: u32) -> u32 {
        if value == 0 {
            1
        } else {
            value
        }
    }

    /// `any`, a single port or `a-b`.
    pub fn src_port(&self) -> String {
        let (start, end) = (Self::bound(self.src_start), Self::bound(self.src_end));
        if start == 1 && end == 65535 {
            "any".to_string()
        } else if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        }
    }

    /// A single port or `a-b`.
    pub fn dst_port(&self) -> String {
        let (start, end) = (Self::bound(self.dst_start), Self::bound(self.dst_end));
        if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        }
    }
}

/// `icmp [type t] [code c]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IcmpProtocol {
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub incident_message: String,
}

impl IcmpProtocol {
    fn parse(tokens: &Tokens, base: usize) -> (Self, usize) {
        let mut p = IcmpProtocol::default();
        let base = base + 1;
        if tokens.token_at(base) == "type" {
            p.icmp_type = tokens.token_at(base + 1).parse().unwrap_or(0);
        }
        if tokens.token_at(base + 2) == "code" {
            p.icmp_code = tokens.token_at(base + 3).parse().unwrap_or(0);
        }
        (p, base + 4)
    }
}

/// `ms-rpc [uuid u]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MsRpcProtocol {
    pub uuid: String,
    pub incident_message: String,
}

impl MsRpcProtocol {
    fn parse(tokens: &Tokens, base: usize) -> (Self, usize) {
        let mut p = MsRpcProtocol::default();
        let base = base + 1;
        if tokens.token_at(base) == "uuid" {
            p.uuid = tokens.token_at(base + 1).to_string();
        }
        (p, base + 2)
    }
}

/// `sun-rpc [program a[-b]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SunRpcProtocol {
    pub program_start: String,
    pub program_end: String,
    pub incident_message: String,
}

impl SunRpcProtocol {
    fn parse(tokens: &Tokens, base: usize) -> (Self, usize) {
        let mut p = SunRpcProtocol::default();
        let base = base + 1;
        if tokens.token_at(base) == "program" {
            let text = tokens.token_at(base + 1);
            let (start, end) = text.split_once('-').unwrap_or((text, text));
            if let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>()) {
                let start = start.max(SUN_RPC_MIN_PROGRAM);
                let end = end.min(SUN_RPC_MAX_PROGRAM);
                p.program_start = start.to_string();
                p.program_end = end.to_string();
                if start != end {
                    p.incident_message = SUN_RPC_RANGE_MESSAGE.to_string();
                }
            }
        }
        (p, base + 2)
    }

    /// First program number of the range.
    pub fn program(&self) -> &str {
        &self.program_start
    }
}

/// Parse `a-b` or a single port `a`.
fn parse_range(text: &str) -> Option<(u32, u32)> {
    let (start, end) = text.split_once('-').unwrap_or((text, text));
    Some((start.parse().ok()?, end.parse().ok()?))
}
