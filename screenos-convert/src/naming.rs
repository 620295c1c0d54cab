//! Generated object names and name uniqueness.
//!
//! Objects synthesized by the converter get deterministic names built by
//! the helpers below (`GRP_SM_<zone>`, `Net_SM_<net>_<len>`, ...). The
//! [`NameRegistry`] counts how often each name was handed out so repeated
//! names can be made unique with a `_<n>` suffix.
//!
//! ## Case
//!
//! Target names compare case-insensitively, so `web` and `WEB` count as the
//! same name.

use std::collections::HashMap;

use screenos_core::netutil;

/// Appearance counts of every name handed out so far.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: HashMap<String, Appearance>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Appearance {
    count: usize,
    predefined: bool,
}

/// Outcome of [`NameRegistry::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// First use of the name.
    Unique,
    /// The name was taken; use `unique` instead.
    Renamed { unique: String, predefined: bool },
}

impl NameRegistry {
    /// Reserve a target predefined name.
    pub fn register_predefined(&mut self, name: &str) {
        let entry = self.names.entry(name.to_lowercase()).or_default();
        entry.count += 1;
        entry.predefined = true;
    }

    pub fn appearances(&self, name: &str) -> usize {
        self.names
            .get(&name.to_lowercase())
            .map(|a| a.count)
            .unwrap_or(0)
    }

    /// Count one more use of `name`.
    pub fn claim(&mut self, name: &str) -> Claim {
        let entry = self.names.entry(name.to_lowercase()).or_default();
        entry.count += 1;
        if entry.count == 1 {
            return Claim::Unique;
        }
        Claim::Renamed {
            unique: format!("{}_{}", name, entry.count - 1),
            predefined: entry.predefined,
        }
    }
}

/// True when `name` only uses characters the target accepts.
pub fn is_safe_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-'))
}

/// Replace every character the target does not accept with `_`.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn zone_group(zone: &str) -> String {
    format!("GRP_SM_{zone}")
}

pub fn interface_group(interface: &str) -> String {
    format!("GRP_SM_Interface_{}", interface.replace('/', "_"))
}

pub fn interface_host(interface: &str) -> String {
    format!("HOST_SM_Interface_{}", interface.replace('/', "_"))
}

pub fn network(subnet: &str, netmask: &str) -> String {
    format!("Net_SM_{}_{}", subnet, netutil::mask_length(netmask))
}

pub fn static_route(subnet: &str, netmask: &str) -> String {
    format!("Static_Net_SM_{}_{}", subnet, netutil::mask_length(netmask))
}

/// Domain object name: the FQDN with a leading dot, `.local` appended
/// to single-label names.
pub fn domain(fqdn: &str) -> String {
    let mut name = if fqdn.starts_with('.') {
        fqdn.to_string()
    } else {
        format!(".{fqdn}")
    };
    if name.matches('.').count() < 2 {
        name.push_str(".local");
    }
    name
}

pub fn service_group(name: &str) -> String {
    format!("GRP_SM_Service_{name}")
}

pub fn service(fragment: &str, name: &str) -> String {
    format!("Service_SM_{fragment}_{name}")
}

pub fn sub_policy(from: &str, to: &str) -> String {
    if from == to {
        format!("{from}_sub_policy")
    } else {
        format!("{from}_to_{to}_sub_policy")
    }
}

fn host_or_net(netmask: &str) -> &'static str {
    if netutil::mask_length(netmask) == 32 {
        "HOST"
    } else {
        "NET"
    }
}

pub fn mip_original(ip: &str, netmask: &str) -> String {
    format!("{}_SM_INTERFACE_ORIGINAL_MIP_{}", host_or_net(netmask), ip)
}

pub fn mip_translated(mip: &str, netmask: &str) -> String {
    format!("{}_SM_INTERFACE_TRANSLATED_MIP_{}", host_or_net(netmask), mip)
}

pub fn dip_original(ip: &str, range: bool) -> String {
    format!("SM_{}_ORIG_{}", if range { "RANGE" } else { "HOST" }, ip)
}

pub fn dip_translated(dip_id: u32, range: bool) -> String {
    format!("SM_{}_DIP_{}", if range { "RANGE" } else { "HOST" }, dip_id)
}

pub fn vip_original(ip: &str) -> String {
    format!("HOST_SM_INTERFACE_ORIGINAL_VIP_{ip}")
}

pub fn vip_translated(vip: &str, ip: &str) -> String {
    format!("HOST_SM_INTERFACE_TRANSLATED_VIP_{vip}_{ip}")
}

/// Translated destination of policy-based NAT: one host or a range.
pub fn policy_nat_translated(ips: &[String]) -> String {
    match ips {
        [first, last, ..] => format!("RANGE_SM_INTERFACE_TRANSLATED_{first}_{last}"),
        [only] => format!("HOST_SM_INTERFACE_TRANSLATED_{only}"),
        [] => "HOST_SM_INTERFACE_TRANSLATED_".to_string(),
    }
}
