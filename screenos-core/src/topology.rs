//! Interface topology and zone multiplicity.
//!
//! Routes are attached to the interface they leave through, either by
//! name or because the route's network lies on one of the interface's own
//! subnets. A default route marks the interface as leading to the internet.
//!
//! The [`ZoneMultiplicityIndex`] records under which zones each address
//! name was declared; names declared in more than one zone must be renamed
//! before they enter the flat target namespace.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;

use crate::command::{Command, CommandKind, Route, Subnet};
use crate::netutil;

/// Attach route-derived subnets to every interface head.
pub fn resolve_interfaces(commands: &mut [Command]) {
    let routes: Vec<(usize, Route)> = commands
        .iter()
        .filter(|c| !c.skip)
        .filter_map(|c| c.as_route().map(|r| (c.id, r.clone())))
        .collect();

    for cmd in commands.iter_mut() {
        if !matches!(cmd.kind, CommandKind::Interface(_)) {
            continue;
        }
        let mut subnets = Vec::new();
        let mut leads_to_internet = false;
        for (route_id, route) in &routes {
            let by_name = cmd
                .as_interface()
                .is_some_and(|i| !i.name.is_empty() && route.interface == i.name);
            if by_name || cmd.interface_owns_network(&route.network) {
                subnets.push(Subnet {
                    network: netutil::network_of(&route.network, &route.mask),
                    mask: route.mask.clone(),
                    route_id: *route_id,
                });
                leads_to_internet |= route.is_default_route();
            }
        }
        if let CommandKind::Interface(ifc) = &mut cmd.kind {
            debug!("interface {} reaches {} routed subnets", ifc.name, subnets.len());
            ifc.topology = subnets;
            ifc.leads_to_internet |= leads_to_internet;
        }
    }
}

/// Case-insensitive map from address or address-group name to the zones
/// it was declared in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ZoneMultiplicityIndex {
    zones: BTreeMap<String, BTreeSet<String>>,
}

impl ZoneMultiplicityIndex {
    /// Index every non-skipped address and address-group head.
    pub fn build(commands: &[Command]) -> Self {
        let mut index = Self::default();
        for cmd in commands.iter().filter(|c| !c.skip) {
            match &cmd.kind {
                CommandKind::Address(a) => index.insert(&a.name, &a.zone),
                CommandKind::GroupAddress(g) => index.insert(&g.group, &g.zone),
                _ => {}
            }
        }
        index
    }

    fn insert(&mut self, name: &str, zone: &str) {
        self.zones
            .entry(name.to_lowercase())
            .or_default()
            .insert(zone.to_string());
    }

    /// True when `name` was declared under more than one zone.
    pub fn is_multi_zone(&self, name: &str) -> bool {
        self.zones
            .get(&name.to_lowercase())
            .is_some_and(|zones| zones.len() > 1)
    }

    /// Zones `name` was declared under.
    pub fn zones_of(&self, name: &str) -> Vec<&str> {
        self.zones
            .get(&name.to_lowercase())
            .map(|zones| zones.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Names declared under more than one zone.
    pub fn multi_zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones
            .iter()
            .filter(|(_, zones)| zones.len() > 1)
            .map(|(name, _)| name.as_str())
    }
}
