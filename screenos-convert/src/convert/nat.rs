//! Address translation rules.
//!
//! ScreenOS expresses NAT in several places: MIP, VIP and DIP definitions
//! on interfaces referenced by policies, `nat src`/`nat dst` clauses on
//! policies, and the legacy `nat` mode of Trust interfaces. Each becomes
//! one or more [`NatRule`]s; NAT policies also keep an access rule placed
//! by [`Converter::merge_nat_policy_rules`].

use std::collections::HashMap;

use log::debug;
use screenos_core::parsers::PREDEFINED_ZONES;
use screenos_core::{netutil, Command, InterfaceNat, InterfaceType, PolicyNatType, Severity};

use super::policy::PolicyView;
use super::{Converter, Dummy};
use crate::model::{NatMethod, NatRule, NormalizedObject, ObjectKind, ANY, NAT_MARKER};
use crate::naming;

const HOST_MASK: &str = "255.255.255.255";

const MIP_TITLE: &str = "Error creating  NAT rule, from ScreenOS NAT rules of type MIP";
const DIP_ORIGINAL_TITLE: &str = "Error creating  NAT rule, from ScreenOS NAT rules of type DIP";
const DIP_TRANSLATED_TITLE: &str = "Error creating NAT rule, from ScreenOS NAT rules of type DIP";
const DIP_PER_INTERFACE: &str = "ScreenOS NAT policy object does not contain dip-id. NAT rules will be created as much as the number of attached interfaces to destination zone with host IP. NAT rules will be in a disabled mode";
const DIP_SINGLE_INTERFACE: &str = "ScreenOS NAT policy object does not contain dip-id. One NAT rule will be created according to attached interface to destination zone with host IP.";

/// Source translation candidates of a DIP policy.
#[derive(Debug, Default)]
struct DipPlan {
    originals: Vec<String>,
    translated: Vec<String>,
    enabled: Vec<bool>,
    pat: Vec<bool>,
    comment: String,
}

/// One VIP mapping of a destination.
#[derive(Debug, Clone)]
struct VipMapping {
    service: String,
    translated_service: String,
    translated_destination: String,
}

/// `None` for the any object.
fn any_as_none(name: String) -> Option<String> {
    if name == ANY {
        None
    } else {
        Some(name)
    }
}

impl<'a> Converter<'a> {
    /// Line ids of NAT statements when NAT conversion is off.
    pub(super) fn mark_nat_lines(&mut self) {
        let parsed = self.parsed;
        let mut lines = Vec::new();
        for cmd in &parsed.processed {
            match &cmd.kind {
                screenos_core::CommandKind::Interface(_) => {
                    for line in std::iter::once(cmd).chain(cmd.children.iter()) {
                        if line
                            .as_interface()
                            .is_some_and(|i| i.sub_type == InterfaceType::Nat || i.nat.is_some())
                        {
                            lines.push(line.id);
                        }
                    }
                }
                screenos_core::CommandKind::GroupNatDip(_) => {
                    lines.push(cmd.id);
                    lines.extend(cmd.children.iter().map(|c| c.id));
                }
                screenos_core::CommandKind::Policy(p) if p.nat_type != PolicyNatType::Policy => {
                    lines.push(cmd.id);
                    lines.extend(cmd.children.iter().map(|c| c.id));
                }
                _ => {}
            }
        }
        lines.sort_unstable();
        debug!("{} NAT lines left out", lines.len());
        self.skipped_nat_lines = lines;
    }

    fn interface_entries(&self) -> impl Iterator<Item = (&'a Command, &'a Command)> {
        let parsed = self.parsed;
        parsed
            .processed
            .iter()
            .filter(|c| c.as_interface().is_some())
            .flat_map(|head| head.children.iter().map(move |child| (head, child)))
    }

    fn find_mip(&self, reference: &str) -> Option<&'a Command> {
        self.interface_entries()
            .map(|(_, child)| child)
            .find(|child| {
                matches!(child.as_interface().and_then(|i| i.nat.as_ref()),
                    Some(InterfaceNat::Mip(mip)) if mip.reference_name() == reference)
            })
    }

    /// Interface line defining `dip_id`, following a DIP group to its
    /// first member.
    fn find_dip(&self, dip_id: u32) -> Option<&'a Command> {
        let parsed = self.parsed;
        let resolved = parsed
            .processed
            .iter()
            .filter(|c| c.as_group_dip().is_some_and(|g| g.group_id == dip_id))
            .flat_map(|c| c.children.iter())
            .filter_map(Command::as_group_dip)
            .map(|g| g.member)
            .find(|&m| m != 0)
            .unwrap_or(dip_id);
        self.interface_entries()
            .map(|(_, child)| child)
            .find(|child| {
                matches!(child.as_interface().and_then(|i| i.nat.as_ref()),
                    Some(InterfaceNat::Dip(dip)) if dip.dip_id == resolved)
            })
    }

    /// VIP lines matching a destination, with the VIP address resolved to
    /// the interface address when the VIP uses it.
    fn find_vips(&self, reference: &str) -> Vec<(&'a Command, String)> {
        let parsed = self.parsed;
        let mut found = Vec::new();
        for head in parsed.processed.iter().filter(|c| c.as_interface().is_some()) {
            let mut interface_ip = String::new();
            for child in head.children.iter().filter(|c| !c.skip) {
                let Some(entry) = child.as_interface() else { continue };
                if entry.sub_type == InterfaceType::Ip && !entry.secondary {
                    interface_ip = entry.ip.clone();
                }
                let Some(InterfaceNat::Vip(vip)) = &entry.nat else { continue };
                let address = if vip.use_interface_ip || vip.vip.is_empty() {
                    interface_ip.clone()
                } else {
                    vip.vip.clone()
                };
                if format!("VIP({address})") == reference || reference.contains(&entry.name) {
                    found.push((child, address));
                }
            }
        }
        found
    }

    /// Existing host or network for `ip`/`mask`, created as `name` when
    /// missing.
    fn address_object(&mut self, ip: &str, mask: &str, name: String) -> String {
        if let Some(existing) = self.store.find_address(ip, mask) {
            return existing.name.clone();
        }
        let kind = if netutil::mask_length(mask) == 32 {
            ObjectKind::Host { ip: ip.to_string() }
        } else {
            ObjectKind::Network {
                subnet: netutil::network_of(ip, mask),
                netmask: mask.to_string(),
            }
        };
        let mut object = NormalizedObject::new(name, kind);
        self.check_name(&mut object, None);
        let resolved = object.name.clone();
        self.store.add(object);
        resolved
    }

    fn range_object(&mut self, first: &str, last: &str, name: String) -> String {
        if let Some(existing) = self.store.find_range(first, last) {
            return existing.name.clone();
        }
        let mut object = NormalizedObject::new(
            name,
            ObjectKind::Range {
                first: first.to_string(),
                last: last.to_string(),
            },
        );
        self.check_name(&mut object, None);
        let resolved = object.name.clone();
        self.store.add(object);
        resolved
    }

    /// Original source of a NAT rule: one resolved entry, or a
    /// `GRP_SM_SRC_RULE_<id>` group of all entries.
    fn nat_source(&mut self, view: &PolicyView<'a>) -> String {
        if let [only] = view.sources.as_slice() {
            return self.source_reference(only, view, true);
        }
        let group = format!("GRP_SM_SRC_RULE_{}", view.id);
        if self.store.contains(&group) {
            return group;
        }
        if let Some(existing) = self.store.find_network_group(&view.sources) {
            return existing.name.clone();
        }
        let mut object = NormalizedObject::new(group, ObjectKind::NetworkGroup { members: Vec::new() });
        for source in &view.sources {
            let resolved = self.source_reference(source, view, true);
            object.add_member(&resolved);
        }
        object.line_id = view.cmd.id;
        let resolved = object.name.clone();
        self.store.add(object);
        resolved
    }

    fn nat_destination(&mut self, view: &PolicyView<'a>) -> String {
        if let [only] = view.destinations.as_slice() {
            return self.destination_reference(only, view, true);
        }
        let group = format!("GRP_SM_DST_RULE_{}", view.id);
        if self.store.contains(&group) {
            return group;
        }
        if let Some(existing) = self.store.find_network_group(&view.destinations) {
            return existing.name.clone();
        }
        let mut object = NormalizedObject::new(group, ObjectKind::NetworkGroup { members: Vec::new() });
        for destination in &view.destinations {
            let resolved = self.destination_reference(destination, view, true);
            object.add_member(&resolved);
        }
        object.line_id = view.cmd.id;
        let resolved = object.name.clone();
        self.store.add(object);
        resolved
    }

    fn nat_service(&mut self, view: &PolicyView<'a>) -> String {
        if let [only] = view.services.as_slice() {
            return self.service_reference(only, view);
        }
        let group = format!("GRP_SM_Service_RULE_{}", view.id);
        if self.store.contains(&group) {
            return group;
        }
        let converted: Vec<String> = view
            .services
            .iter()
            .map(|s| self.services.get(s).cloned().unwrap_or_else(|| s.clone()))
            .collect();
        if let Some(existing) = self.store.find_service_group(&converted) {
            return existing.name.clone();
        }
        let mut object = NormalizedObject::new(group, ObjectKind::ServiceGroup { members: Vec::new() });
        for service in &view.services {
            let resolved = self.service_reference(service, view);
            object.add_member(&resolved);
        }
        object.line_id = view.cmd.id;
        let resolved = object.name.clone();
        self.store.add(object);
        resolved
    }

    fn mixed_nat_note(&mut self, view: &PolicyView<'a>, kept: &str) {
        if view.cmd.as_policy().is_some_and(|p| p.mixed_nat) {
            self.note(
                view.cmd.id,
                format!("Complex ScreenOS NAT policy is not supported, only {kept} NAT will be considered"),
                format!("Policy NAT object details: {}.", view.cmd.text),
                Severity::Informative,
            );
        }
    }

    fn override_policy_incident(view: &mut PolicyView<'a>, message: String) {
        view.incident = Severity::ManualActionRequired;
        view.incident_message = message;
    }

    /// Static NAT in both directions for every MIP destination.
    pub(super) fn add_mip_nat(&mut self) {
        for mut view in self.policy_views(PolicyNatType::Mip) {
            self.mixed_nat_note(&view, "MIP");
            let mut resolved: HashMap<String, (String, String)> = HashMap::new();
            for idx in 0..view.destinations.len() {
                let destination = view.destinations[idx].clone();
                if let Some((original, _)) = resolved.get(&destination) {
                    view.destinations[idx] = original.clone();
                    continue;
                }
                let (original, translated) = match self.find_mip(&destination) {
                    Some(line) => {
                        let Some(InterfaceNat::Mip(mip)) =
                            line.as_interface().and_then(|i| i.nat.as_ref())
                        else {
                            continue;
                        };
                        let original = self.address_object(
                            &mip.mip,
                            &mip.mask,
                            naming::mip_original(&mip.mip, &mip.mask),
                        );
                        let translated = self.address_object(
                            &mip.ip,
                            &mip.mask,
                            naming::mip_translated(&mip.mip, &mip.mask),
                        );
                        view.destinations[idx] = original.clone();
                        (original, translated)
                    }
                    None => {
                        Self::override_policy_incident(
                            &mut view,
                            format!("Mip interface object: {destination} does not exist"),
                        );
                        let description = format!("Interface MIP object details: {destination}.");
                        let original = self.lookup_or_dummy(
                            &format!("{destination}_orig"),
                            Dummy::Network,
                            view.cmd,
                            MIP_TITLE,
                            &description,
                        );
                        let translated = self.lookup_or_dummy(
                            &format!("{destination}_translated"),
                            Dummy::Network,
                            view.cmd,
                            MIP_TITLE,
                            &description,
                        );
                        (original, translated)
                    }
                };
                resolved.insert(destination, (original.clone(), translated.clone()));

                let source = self.nat_source(&view);
                let service = self.nat_service(&view);

                let mut inbound = NatRule::new(NatMethod::Static, "MIP", view.cmd.id);
                inbound.enabled = view.enabled;
                inbound.source = any_as_none(source.clone());
                inbound.destination = Some(original.clone());
                inbound.service = any_as_none(service.clone());
                inbound.translated_destination = Some(translated.clone());
                self.nat_rules.push(inbound);

                let mut outbound = NatRule::new(NatMethod::Static, "MIP", view.cmd.id);
                outbound.enabled = view.enabled;
                outbound.source = Some(translated);
                outbound.destination = any_as_none(source);
                outbound.service = any_as_none(service);
                outbound.translated_source = Some(original);
                self.nat_rules.push(outbound);
            }
            self.rule_from_nat_policy(&view);
        }
    }

    /// Static destination NAT for every VIP destination, one rule per
    /// VIP port mapping.
    pub(super) fn add_vip_nat(&mut self) {
        for mut view in self.policy_views(PolicyNatType::Vip) {
            let mut resolved: HashMap<String, Option<(String, Vec<VipMapping>)>> = HashMap::new();
            for idx in 0..view.destinations.len() {
                let destination = view.destinations[idx].clone();
                if !resolved.contains_key(&destination) {
                    let target = self.resolve_vip(&mut view, &destination);
                    resolved.insert(destination.clone(), target);
                }
                let Some(Some((original, mappings))) = resolved.get(&destination).cloned() else {
                    continue;
                };
                view.destinations[idx] = original.clone();
                let source = self.nat_source(&view);
                for mapping in mappings {
                    let mut rule = NatRule::new(NatMethod::Static, "VIP", view.cmd.id);
                    rule.enabled = view.enabled;
                    rule.source = any_as_none(source.clone());
                    rule.destination = Some(original.clone());
                    rule.service = any_as_none(mapping.service);
                    rule.translated_service = Some(mapping.translated_service);
                    rule.translated_destination = Some(mapping.translated_destination);
                    self.nat_rules.push(rule);
                }
            }
            self.mixed_nat_note(&view, "VIP");
            self.rule_from_nat_policy(&view);
        }
    }

    fn resolve_vip(
        &mut self,
        view: &mut PolicyView<'a>,
        destination: &str,
    ) -> Option<(String, Vec<VipMapping>)> {
        let vips = self.find_vips(destination);
        let Some((_, address)) = vips.first() else {
            Self::override_policy_incident(
                view,
                format!("Vip interface object: {destination} does not exist, configuration error"),
            );
            return None;
        };
        let original = self.address_object(address, HOST_MASK, naming::vip_original(address));

        let mut mappings = Vec::new();
        for (line, address) in &vips {
            let Some(InterfaceNat::Vip(vip)) = line.as_interface().and_then(|i| i.nat.as_ref())
            else {
                continue;
            };
            let details = format!("Interface VIP object details: {}.", line.text);
            let Some(data) = &vip.data else {
                self.note(
                    line.id,
                    format!("{}, NAT rule will not be created", line.incident_message),
                    details,
                    Severity::ManualActionRequired,
                );
                continue;
            };
            if line.incident != Severity::None && !line.incident_message.is_empty() {
                self.note(line.id, line.incident_message.clone(), details.clone(), line.incident);
            }

            let translated_destination = self.address_object(
                &data.dest_ip,
                HOST_MASK,
                naming::vip_translated(address, &data.dest_ip),
            );
            let (translated_service, service_type) =
                match self.service_by_name(&data.dest_service_name) {
                    Some(converted) => {
                        let service_type = self.service_type(&converted, &data.dest_service_name);
                        (converted, service_type)
                    }
                    None => {
                        let dummy = self.lookup_or_dummy(
                            &data.dest_service_name,
                            Dummy::Service,
                            line,
                            &format!(
                                "Error creating NAT rule, service {} does not exist in target objects",
                                data.dest_service_name
                            ),
                            &format!("Interface VIP object details: {destination}."),
                        );
                        (dummy, String::new())
                    }
                };
            let service = match self.service_on_port(&service_type, data.src_port) {
                Some(existing) => existing,
                None if service_type.is_empty() || service_type == "GROUP" => self.lookup_or_dummy(
                    &format!("VIP_{}_{}", address, data.src_port),
                    Dummy::Service,
                    line,
                    "Error creating NAT rule, check if translated service does not exist or a group of services",
                    &details,
                ),
                None => {
                    self.service_by_port_key("VIP", &format!("{service_type}_{}", data.src_port))
                }
            };
            mappings.push(VipMapping {
                service,
                translated_service,
                translated_destination,
            });
        }
        Some((original, mappings))
    }

    /// Source translation candidates for a DIP policy; `None` when no rule
    /// can be built.
    fn prepare_dip(&mut self, view: &mut PolicyView<'a>) -> Option<DipPlan> {
        let dip_id = view.cmd.as_policy().map_or(0, |p| p.dip_id);
        let mut plan = DipPlan::default();

        if dip_id == 0 {
            if !self.is_zone_available(&view.to, view.cmd) {
                return None;
            }
            let zone_group = naming::zone_group(&view.to);
            let Some(group) = self.store.get(&zone_group) else {
                self.note(
                    view.cmd.id,
                    format!(
                        "ScreenOS NAT policy object does not contain dip-id. Zone object \"{}\" does not attach any interfaces to it. Please review for further possible modifications to objects before migration",
                        view.to
                    ),
                    format!("Policy DIP object details: {}.", view.cmd.text),
                    Severity::Informative,
                );
                return None;
            };
            let members = group.members().to_vec();
            let original = self.nat_source(view);
            for member in members {
                let interface = member.trim_start_matches("GRP_SM_Interface_");
                let host = naming::interface_host(interface);
                if matches!(self.store.get(&host).map(|o| &o.kind), Some(ObjectKind::Host { .. })) {
                    plan.originals.push(original.clone());
                    plan.translated.push(host);
                    plan.enabled.push(false);
                    plan.pat.push(true);
                }
            }
            if plan.translated.len() > 1 {
                self.note(
                    view.cmd.id,
                    DIP_PER_INTERFACE,
                    format!("Policy DIP object details: {}.", view.cmd.text),
                    Severity::ManualActionRequired,
                );
                plan.comment = DIP_PER_INTERFACE.to_string();
            } else {
                plan.comment = DIP_SINGLE_INTERFACE.to_string();
                if let Some(last) = plan.enabled.last_mut() {
                    *last = view.enabled;
                }
            }
            return Some(plan);
        }

        let found = self.find_dip(dip_id).and_then(|line| {
            match line.as_interface().and_then(|i| i.nat.as_ref()) {
                Some(InterfaceNat::Dip(dip)) => Some((line, dip)),
                _ => None,
            }
        });
        match found {
            Some((line, dip)) => {
                if dip.dip_id != dip_id {
                    self.note(
                        view.cmd.id,
                        format!(
                            "ScreenOS DIP NAT rule using group dip-id {dip_id}. Modifying the dip-id to dip-id {} first member of group ",
                            dip.dip_id
                        ),
                        format!("Policy DIP object details: {}.", view.cmd.text),
                        Severity::Informative,
                    );
                }
                if line.incident != Severity::None {
                    self.note(
                        line.id,
                        line.incident_message.clone(),
                        format!("Interface DIP object details: {}.", line.text),
                        line.incident,
                    );
                }
                if !dip.shift_from.is_empty() {
                    let last =
                        netutil::shift_range_end(&dip.shift_from, &dip.ip_start, &dip.ip_end);
                    let original = self.range_object(
                        &dip.shift_from,
                        &last,
                        naming::dip_original(&dip.shift_from, true),
                    );
                    let translated = self.range_object(
                        &dip.ip_start,
                        &dip.ip_end,
                        naming::dip_translated(dip.dip_id, true),
                    );
                    plan.originals.push(original);
                    plan.translated.push(translated);
                    plan.pat.push(false);
                } else {
                    let original = self.nat_source(view);
                    let translated = self.address_object(
                        &dip.ip_start,
                        HOST_MASK,
                        naming::dip_translated(dip.dip_id, false),
                    );
                    plan.originals.push(original);
                    plan.translated.push(translated);
                    plan.pat.push(dip.pat());
                    if dip.ip_start != dip.ip_end {
                        self.note(
                            line.id,
                            "ScreenOS DIP object contains range of IPs. Modifying the range to only one IP by using the first IP of the range",
                            format!("DIP object details: {}.", line.text),
                            Severity::Informative,
                        );
                    }
                }
                plan.enabled.push(view.enabled);
            }
            None => {
                Self::override_policy_incident(
                    view,
                    format!(
                        "ScreenOS configuration missing an interface object defining dip-id {dip_id}. Please review for further possible modifications to objects before migration"
                    ),
                );
                let description =
                    format!("Missing information of dip-id {dip_id} in ScreenOS configuration.");
                let original = self.lookup_or_dummy(
                    &format!("{dip_id}_orig"),
                    Dummy::Network,
                    view.cmd,
                    DIP_ORIGINAL_TITLE,
                    &description,
                );
                let translated = self.lookup_or_dummy(
                    &format!("{dip_id}_translated"),
                    Dummy::Network,
                    view.cmd,
                    DIP_TRANSLATED_TITLE,
                    &description,
                );
                plan.originals.push(original);
                plan.translated.push(translated);
                plan.pat.push(false);
                plan.enabled.push(view.enabled);
                plan.comment =
                    format!("Missing information of dip-id {dip_id} in ScreenOS configuration");
            }
        }
        Some(plan)
    }

    /// Hide NAT behind a DIP address, static NAT for shifted DIP ranges.
    pub(super) fn add_dip_nat(&mut self) {
        for mut view in self.policy_views(PolicyNatType::Dip) {
            if let Some(plan) = self.prepare_dip(&mut view) {
                let destination = self.nat_destination(&view);
                let service = self.nat_service(&view);
                for (idx, (original, translated)) in
                    plan.originals.iter().zip(&plan.translated).enumerate()
                {
                    let method = if plan.pat[idx] {
                        NatMethod::Hide
                    } else {
                        NatMethod::Static
                    };
                    let mut rule = NatRule::new(method, "DIP", view.cmd.id);
                    rule.enabled = plan.enabled[idx];
                    rule.source = any_as_none(original.clone());
                    rule.translated_source = Some(translated.clone());
                    rule.destination = any_as_none(destination.clone());
                    rule.service = any_as_none(service.clone());
                    rule.comment = plan.comment.clone();
                    self.nat_rules.push(rule);
                }
            }
            self.rule_from_nat_policy(&view);
        }
    }

    /// Translated destination and optional translated service of a
    /// `nat dst ip <a> [<b>] [port <p>]` clause.
    fn prepare_policy_dest(&mut self, view: &PolicyView<'a>) -> Option<(String, Option<String>)> {
        let policy = view.cmd.as_policy()?;
        let details = format!("Policy object details: {}.", view.cmd.text);
        let translated = match policy.dest_nat_ips.as_slice() {
            [] => {
                self.note(
                    view.cmd.id,
                    "ScreenOS NAT policy command bad format. NAT rule will not be created",
                    details,
                    Severity::ManualActionRequired,
                );
                return None;
            }
            [first, last, ..] => self.range_object(
                first,
                last,
                naming::policy_nat_translated(&policy.dest_nat_ips),
            ),
            [only] => self.address_object(
                only,
                HOST_MASK,
                naming::policy_nat_translated(&policy.dest_nat_ips),
            ),
        };

        if policy.dest_nat_port == 0 {
            return Some((translated, None));
        }
        let port = policy.dest_nat_port;
        let first = view.services.first().cloned().unwrap_or_default();
        let original = self.service_reference(&first, view);
        let service_type = self.service_type(&original, &first);
        let translated_service = if service_type.is_empty() || service_type == "GROUP" {
            self.lookup_or_dummy(
                &format!("PolicyBasedNAT_{port}"),
                Dummy::Service,
                view.cmd,
                "Error creating NAT rule, check if original service does not exist or a group of services",
                &details,
            )
        } else {
            match self.service_on_port(&service_type, port) {
                Some(existing) => existing,
                None => self.service_by_port_key("TRANSLATED", &format!("{service_type}_{port}")),
            }
        };
        Some((translated, Some(translated_service)))
    }

    /// A translated service may not be a group.
    fn ungrouped_service(&mut self, name: String, view: &PolicyView<'a>) -> String {
        let is_group = matches!(
            self.store.get(&name).map(|o| &o.kind),
            Some(ObjectKind::ServiceGroup { .. })
        );
        if !is_group {
            return name;
        }
        self.lookup_or_dummy(
            &format!("{name}_Group_Err"),
            Dummy::Service,
            view.cmd,
            "Error creating  NAT rule. Translated service object of NAT rule can not be group of services",
            &format!("Policy NAT object details: {}.", view.cmd.text),
        )
    }

    pub(super) fn add_policy_dest_nat(&mut self) {
        for view in self.policy_views(PolicyNatType::PolicyBaseDest) {
            if let Some((translated, port)) = self.prepare_policy_dest(&view) {
                let service = self.nat_service(&view);
                let source = self.nat_source(&view);
                let destination = self.nat_destination(&view);
                let mut rule = NatRule::new(NatMethod::Static, "PolicyBasedDestNat", view.cmd.id);
                rule.enabled = view.enabled;
                rule.service = any_as_none(service);
                rule.translated_service = match port {
                    Some(port) => Some(self.ungrouped_service(port, &view)),
                    None => None,
                };
                rule.source = any_as_none(source);
                rule.destination = any_as_none(destination);
                rule.translated_destination = Some(translated);
                self.nat_rules.push(rule);
            }
            self.rule_from_nat_policy(&view);
        }
    }

    pub(super) fn add_policy_src_dest_nat(&mut self) {
        for mut view in self.policy_views(PolicyNatType::PolicyBaseSrcDest) {
            let Some(plan) = self.prepare_dip(&mut view) else {
                self.rule_from_nat_policy(&view);
                continue;
            };
            let Some((translated_destination, port)) = self.prepare_policy_dest(&view) else {
                self.rule_from_nat_policy(&view);
                continue;
            };
            let service = self.nat_service(&view);
            let destination = self.nat_destination(&view);
            let translated_service = match port {
                Some(port) => Some(self.ungrouped_service(port, &view)),
                None => None,
            };
            let split = plan.pat.first() == Some(&true) && translated_service.is_some();
            if split {
                self.note(
                    view.cmd.id,
                    "ScreenOS policy based source & destination NAT policy command. Conflict has been detected in port translation. NAT rules will be created separately for source and destination",
                    format!("Policy NAT object details: {}.", view.cmd.text),
                    Severity::Informative,
                );
            }
            for (idx, (original, translated)) in
                plan.originals.iter().zip(&plan.translated).enumerate()
            {
                if plan.pat[idx] && translated_service.is_some() {
                    let mut source_rule =
                        NatRule::new(NatMethod::Hide, "PolicyBasedSrcNAT", view.cmd.id);
                    source_rule.enabled = plan.enabled[idx];
                    source_rule.comment = plan.comment.clone();
                    source_rule.service = any_as_none(service.clone());
                    source_rule.source = any_as_none(original.clone());
                    source_rule.translated_source = Some(translated.clone());
                    source_rule.destination = any_as_none(destination.clone());
                    self.nat_rules.push(source_rule);
                    if idx == 0 {
                        let source = self.nat_source(&view);
                        let mut destination_rule =
                            NatRule::new(NatMethod::Static, "PolicyBasedDestNAT", view.cmd.id);
                        destination_rule.enabled = plan.enabled[idx];
                        destination_rule.comment = plan.comment.clone();
                        destination_rule.service = any_as_none(service.clone());
                        destination_rule.translated_service = translated_service.clone();
                        destination_rule.source = any_as_none(source);
                        destination_rule.destination = any_as_none(destination.clone());
                        destination_rule.translated_destination =
                            Some(translated_destination.clone());
                        self.nat_rules.push(destination_rule);
                    }
                } else {
                    let method = if plan.pat[idx] {
                        NatMethod::Hide
                    } else {
                        NatMethod::Static
                    };
                    let mut rule = NatRule::new(method, "PolicyBasedSrcDestNAT", view.cmd.id);
                    rule.enabled = plan.enabled[idx];
                    rule.comment = plan.comment.clone();
                    rule.service = any_as_none(service.clone());
                    rule.translated_service = translated_service.clone();
                    rule.source = any_as_none(original.clone());
                    rule.translated_source = Some(translated.clone());
                    rule.destination = any_as_none(destination.clone());
                    rule.translated_destination = Some(translated_destination.clone());
                    self.nat_rules.push(rule);
                }
            }
            self.rule_from_nat_policy(&view);
        }
    }

    /// Hide NAT from Trust towards Untrust and DMZ for devices running the
    /// legacy interface `nat` mode with all predefined zones in trust-vr.
    pub(super) fn add_legacy_nat(&mut self) {
        let parsed = self.parsed;
        let in_trust_vr = PREDEFINED_ZONES.iter().all(|zone| {
            parsed
                .processed
                .iter()
                .filter_map(Command::as_zone)
                .any(|z| z.name == *zone && z.vrouter == "trust-vr")
        });
        if !in_trust_vr {
            return;
        }
        let trust_group = naming::zone_group("Trust");
        let Some(trust) = self.store.get(&trust_group) else {
            return;
        };
        let members = trust.members().to_vec();
        let nat_members: Vec<String> = members
            .iter()
            .filter(|m| self.store.get(m).is_some_and(|o| o.has_marker(NAT_MARKER)))
            .cloned()
            .collect();
        if nat_members.is_empty() {
            return;
        }
        let source = if nat_members.len() == members.len() {
            if let [only] = members.as_slice() {
                only.clone()
            } else {
                trust_group
            }
        } else {
            let mut group = NormalizedObject::new(
                "GRP_SM_NAT_INT_TRUST",
                ObjectKind::NetworkGroup {
                    members: nat_members,
                },
            );
            self.check_name(&mut group, None);
            let name = group.name.clone();
            self.store.add(group);
            name
        };

        for zone in ["Untrust", "DMZ"] {
            let zone_group = naming::zone_group(zone);
            let Some(group) = self.store.get(&zone_group) else {
                continue;
            };
            let separator = if zone == "DMZ" { " " } else { "" };
            let mut created = 0;
            for member in group.members().to_vec() {
                let host = naming::interface_host(member.trim_start_matches("GRP_SM_Interface_"));
                if !self.store.contains(&host) {
                    continue;
                }
                let mut rule = NatRule::new(NatMethod::Hide, "InterfaceBasedNAT", 0);
                rule.enabled = false;
                rule.source = Some(source.clone());
                rule.translated_source = Some(host);
                rule.destination = Some(zone_group.clone());
                rule.comment = format!(
                    "Legacy NAT, Trust to {zone}{separator}- Due to multiple interfaces in {zone} zone, NAT rule will be disabled"
                );
                self.nat_rules.push(rule);
                created += 1;
            }
            if created == 1 {
                if let Some(rule) = self.nat_rules.last_mut() {
                    rule.enabled = true;
                    rule.comment = format!("Legacy NAT, Trust to {zone}");
                }
            }
        }
    }
}
