//! Zones, addresses, address groups, ip pools and interfaces.

use log::debug;
use screenos_core::{netutil, AddressType, Command, CommandKind, InterfaceType, Severity};

use super::{Converter, DOMAIN_TITLE};
use crate::model::{NormalizedObject, ObjectKind, DEFAULT_GATEWAY_MARKER, NAT_MARKER};
use crate::naming;

const MULTI_ZONE_TITLE: &str = "ScreenOs object with the same name is attached to different zones. Applying zone name to object name for target name uniqueness.";

impl<'a> Converter<'a> {
    /// One zone object per zone declaration; `block` lines only mark the
    /// zone as blocking intra-zone traffic.
    pub(super) fn add_zones(&mut self) {
        let parsed = self.parsed;
        for cmd in &parsed.processed {
            let Some(zone) = cmd.as_zone() else { continue };
            if cmd.skip {
                continue;
            }
            if zone.policy_context {
                self.blocked_zones.insert(zone.name.clone());
                continue;
            }
            let mut object = NormalizedObject::new(zone.name.as_str(), ObjectKind::Zone);
            self.apply_incident(&mut object, cmd);
            if self.is_zone_object(&zone.name) {
                continue;
            }
            self.check_name(&mut object, Some(cmd));
            self.store.add(object);
        }
    }

    /// Addresses and address groups, then the zone-qualified copies of
    /// names declared in several zones.
    pub(super) fn add_addresses(&mut self) {
        let parsed = self.parsed;
        for cmd in &parsed.processed {
            match &cmd.kind {
                CommandKind::Address(_) => self.add_address(cmd),
                CommandKind::GroupAddress(_) => self.add_address_group(cmd),
                _ => {}
            }
        }
        self.add_deferred();
    }

    fn add_address(&mut self, cmd: &'a Command) {
        let Some(address) = cmd.as_address() else { return };
        if cmd.skip || !self.is_zone_available(&address.zone, cmd) {
            return;
        }
        let kind = match address.address_type {
            AddressType::Host => ObjectKind::Host {
                ip: address.ip.clone(),
            },
            AddressType::Network => ObjectKind::Network {
                subnet: address.ip.clone(),
                netmask: address.netmask.clone(),
            },
            AddressType::Domain => ObjectKind::Domain {
                fqdn: address.domain.clone(),
            },
            AddressType::Na => return,
        };
        let mut object = NormalizedObject::new(address.name.as_str(), kind).with_zone(&address.zone);
        object.comment = cmd.comment.clone();
        self.apply_incident(&mut object, cmd);

        let is_domain = address.address_type == AddressType::Domain;
        let multi_zone = self.parsed.is_name_multi_zone(&address.name);
        if is_domain {
            self.note_domain(cmd, &mut object, &address.domain, multi_zone);
        }
        let Some(mut object) = self.defer_multi_zone(object, cmd) else {
            return;
        };
        if !is_domain {
            self.check_name(&mut object, Some(cmd));
        }
        self.store.add(object);
    }

    fn add_address_group(&mut self, cmd: &'a Command) {
        let Some(group) = cmd.as_group_address() else { return };
        if cmd.skip || !self.is_zone_available(&group.zone, cmd) {
            return;
        }
        let mut object = NormalizedObject::new(
            group.group.as_str(),
            ObjectKind::NetworkGroup {
                members: Vec::new(),
            },
        )
        .with_zone(&group.zone);
        object.comment = cmd.comment.clone();
        for child in cmd.children.iter().filter(|c| !c.skip) {
            let Some(entry) = child.as_group_address() else { continue };
            if !entry.member.is_empty() {
                object.add_member(&entry.member);
            }
            if object.comment.is_empty() && !child.comment.is_empty() {
                object.comment = child.comment.clone();
            }
        }
        self.apply_incident(&mut object, cmd);
        let Some(mut object) = self.defer_multi_zone(object, cmd) else {
            return;
        };
        self.check_name(&mut object, Some(cmd));
        self.store.add(object);
    }

    fn note_domain(
        &mut self,
        cmd: &Command,
        object: &mut NormalizedObject,
        fqdn: &str,
        multi_zone: bool,
    ) {
        let dotted = naming::domain(fqdn);
        let description = match (&object.zone, multi_zone) {
            (Some(zone), true) => format!(
                "ScreenOS name: {}, attached to zone {}. New name: {}",
                object.name, zone, dotted
            ),
            _ => format!("ScreenOS name: {}. New name: {}", object.name, dotted),
        };
        object.incident = object.incident.max(Severity::Informative);
        self.note(cmd.id, DOMAIN_TITLE, description, Severity::Informative);
    }

    /// Hold back an object whose name is declared in more than one zone.
    /// Returns the object when it can be added right away.
    fn defer_multi_zone(
        &mut self,
        mut object: NormalizedObject,
        cmd: &'a Command,
    ) -> Option<NormalizedObject> {
        if !self.parsed.is_name_multi_zone(&object.name) {
            return Some(object);
        }
        let zone = object.zone.clone().unwrap_or_default();
        self.note(
            cmd.id,
            MULTI_ZONE_TITLE,
            format!(
                "Object name: {name}, attached zone: {zone}. Modified name: {name}_{zone}",
                name = object.name
            ),
            Severity::Informative,
        );
        object.incident = object.incident.max(Severity::Informative);
        self.deferred.push((object, cmd));
        None
    }

    fn add_deferred(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        let mut renamed = Vec::with_capacity(deferred.len());
        for (mut object, cmd) in deferred {
            let original = object.name.clone();
            let zone = object.zone.clone().unwrap_or_default();
            object.name = format!("{original}_{zone}");
            self.check_name(&mut object, Some(cmd));
            renamed.push((original, object.name.clone(), zone));
            self.store.add(object);
        }
        for (original, name, zone) in renamed {
            self.store.replace_member(&original, &name, Some(&zone));
        }
    }

    pub(super) fn add_ip_pools(&mut self) {
        let parsed = self.parsed;
        for cmd in &parsed.processed {
            let CommandKind::IpPool(pool) = &cmd.kind else { continue };
            if cmd.skip {
                continue;
            }
            let mut object = NormalizedObject::new(
                pool.name.as_str(),
                ObjectKind::Range {
                    first: pool.first.clone(),
                    last: pool.last.clone(),
                },
            );
            object.comment = cmd.comment.clone();
            self.apply_incident(&mut object, cmd);
            self.check_name(&mut object, Some(cmd));
            self.store.add(object);
        }
    }

    /// Interface groups holding the interface subnets and routed networks,
    /// and one zone group per zone holding its interface groups.
    pub(super) fn add_interfaces(&mut self) {
        let parsed = self.parsed;
        for cmd in &parsed.processed {
            let Some(interface) = cmd.as_interface() else { continue };
            if cmd.skip || interface.sub_type != InterfaceType::Zone {
                continue;
            }
            if !self.is_zone_available(&interface.zone, cmd) {
                continue;
            }

            let mut group = NormalizedObject::new(
                naming::interface_group(&interface.name),
                ObjectKind::NetworkGroup {
                    members: Vec::new(),
                },
            );
            let mut has_nat = false;

            for subnet in &interface.topology {
                let mut network = NormalizedObject::new(
                    naming::static_route(&subnet.network, &subnet.mask),
                    ObjectKind::Network {
                        subnet: subnet.network.clone(),
                        netmask: subnet.mask.clone(),
                    },
                );
                if let Some(route) = parsed.processed.iter().find(|c| c.id == subnet.route_id) {
                    self.apply_incident(&mut network, route);
                }
                group.add_member(&network.name);
                self.store.add(network);
            }

            for child in cmd.children.iter().filter(|c| !c.skip) {
                let Some(entry) = child.as_interface() else { continue };
                match entry.sub_type {
                    InterfaceType::Ip => {
                        let subnet = netutil::network_of(&entry.ip, &entry.mask);
                        let mut network = NormalizedObject::new(
                            naming::network(&subnet, &entry.mask),
                            ObjectKind::Network {
                                subnet,
                                netmask: entry.mask.clone(),
                            },
                        );
                        network.line_id = child.id;
                        group.add_member(&network.name);
                        self.apply_incident(&mut group, child);
                        self.store.add(network);
                        if !entry.secondary {
                            let mut host = NormalizedObject::new(
                                naming::interface_host(&interface.name),
                                ObjectKind::Host {
                                    ip: entry.ip.clone(),
                                },
                            );
                            host.line_id = child.id;
                            self.store.add(host);
                        }
                    }
                    InterfaceType::Nat => has_nat = true,
                    _ => {}
                }
            }

            if has_nat {
                group.add_marker(NAT_MARKER);
            }
            self.apply_incident(&mut group, cmd);
            self.check_name(&mut group, Some(cmd));

            let zone_group = self.zone_group_entry(&interface.zone);
            zone_group.add_member(&group.name);
            if interface.leads_to_internet {
                zone_group.add_marker(DEFAULT_GATEWAY_MARKER);
            }
            if has_nat {
                zone_group.add_marker(NAT_MARKER);
            }
            debug!(
                "interface {} joins {} with {} members",
                interface.name,
                naming::zone_group(&interface.zone),
                group.members().len()
            );
            self.store.add(group);
        }
    }

    fn zone_group_entry(&mut self, zone: &str) -> &mut NormalizedObject {
        let idx = match self.zone_groups.iter().position(|(z, _)| z == zone) {
            Some(idx) => idx,
            None => {
                let group = NormalizedObject::new(
                    naming::zone_group(zone),
                    ObjectKind::NetworkGroup {
                        members: Vec::new(),
                    },
                );
                self.zone_groups.push((zone.to_string(), group));
                self.zone_groups.len() - 1
            }
        };
        &mut self.zone_groups[idx].1
    }

    pub(super) fn add_zone_groups(&mut self) {
        for (_, mut group) in std::mem::take(&mut self.zone_groups) {
            self.check_name(&mut group, None);
            self.store.add(group);
        }
    }
}
