//! Services, service groups and predefined-service resolution.
//!
//! A ScreenOS service name resolves through `services`, a map filled in
//! this order: predefined services with exactly one target equivalent,
//! converted custom services, converted service groups, and finally
//! predefined ScreenOS services materialized on first use.

use log::debug;
use screenos_core::{Command, ServiceProtocol, Severity, TimeoutUnit};

use super::Converter;
use crate::model::{NormalizedObject, ObjectKind};
use crate::naming;

const PREDEFINED_SERVICE_TITLE: &str = "ScreenOS service is predefined in the target system. In any use of service, predefined service will be used";

impl<'a> Converter<'a> {
    /// Map ScreenOS predefined services and groups with a single target
    /// equivalent straight to it.
    pub(super) fn upload_predefined_services(&mut self) {
        let knowledge = self.knowledge;
        for mapping in knowledge.group_mappings() {
            if self.store.is_predefined(&mapping.target) {
                self.services
                    .insert(mapping.screenos.clone(), mapping.target.clone());
            }
        }
        for service in knowledge.screenos_services() {
            if let [port] = service.ports.as_slice() {
                if let Some(target) = knowledge.target_service_for(port) {
                    self.services.insert(service.name.clone(), target.to_string());
                }
            }
        }
        debug!("{} predefined services map to target services", self.services.len());
    }

    pub(super) fn add_services(&mut self) {
        let parsed = self.parsed;
        for cmd in &parsed.processed {
            let Some(service) = cmd.as_service() else { continue };
            if service.policy_context {
                continue;
            }
            self.add_service(cmd, &service.name);
        }
    }

    fn add_service(&mut self, cmd: &'a Command, name: &str) {
        let knowledge = self.knowledge;
        let mut timeout = 0;
        let mut protocols: Vec<(&ServiceProtocol, &Command)> = Vec::new();
        for line in std::iter::once(cmd).chain(cmd.children.iter()) {
            if line.skip {
                continue;
            }
            let Some(entry) = line.as_service() else { continue };
            if entry.timeout != 0 {
                timeout = match entry.timeout_unit {
                    TimeoutUnit::Minutes => entry.timeout * 60,
                    TimeoutUnit::TenSeconds => entry.timeout * 10,
                };
            }
            if let Some(protocol) = &entry.protocol {
                protocols.push((protocol, line));
            }
        }
        if protocols.is_empty() {
            return;
        }

        let mut predefined: Vec<String> = Vec::new();
        let mut created: Vec<NormalizedObject> = Vec::new();
        for (protocol, line) in protocols {
            if let Some(target) = knowledge.target_service_for(&protocol.port_key()) {
                self.note(
                    line.id,
                    PREDEFINED_SERVICE_TITLE,
                    format!(
                        "Service object details: {}| Predefined service name: {}.",
                        line.text, target
                    ),
                    Severity::Informative,
                );
                predefined.push(target.to_string());
                continue;
            }
            let kind = match protocol {
                ServiceProtocol::Tcp(p) => ObjectKind::TcpService {
                    port: p.dst_port(),
                    timeout,
                },
                ServiceProtocol::Udp(p) => ObjectKind::UdpService {
                    port: p.dst_port(),
                    timeout,
                },
                ServiceProtocol::Ip(p) => ObjectKind::OtherService {
                    protocol: p.protocol.clone(),
                    timeout,
                },
                ServiceProtocol::Icmp(p) => ObjectKind::IcmpService {
                    icmp_type: p.icmp_type,
                    code: p.icmp_code,
                },
                ServiceProtocol::SunRpc(p) => ObjectKind::RpcService {
                    program: p.program().to_string(),
                },
                ServiceProtocol::MsRpc(p) => ObjectKind::DceRpcService {
                    uuid: p.uuid.clone(),
                },
            };
            let mut object =
                NormalizedObject::new(naming::service(&protocol.name_fragment(), name), kind);
            object.line_id = line.id;
            created.push(object);
        }

        if created.len() + predefined.len() > 1 {
            let mut group = NormalizedObject::new(
                naming::service_group(name),
                ObjectKind::ServiceGroup {
                    members: Vec::new(),
                },
            );
            self.apply_nested_incident(&mut group, cmd);
            for mut object in created {
                self.check_name(&mut object, Some(cmd));
                group.add_member(&object.name);
                self.store.add(object);
            }
            for target in &predefined {
                group.add_member(target);
            }
            self.check_name(&mut group, Some(cmd));
            self.services.insert(name.to_string(), group.name.clone());
            self.store.add(group);
        } else if let Some(mut object) = created.pop() {
            self.apply_nested_incident(&mut object, cmd);
            self.check_name(&mut object, Some(cmd));
            self.services.insert(name.to_string(), object.name.clone());
            self.store.add(object);
        } else if let Some(target) = predefined.pop() {
            self.services.insert(name.to_string(), target);
        }
    }

    pub(super) fn add_service_groups(&mut self) {
        let parsed = self.parsed;
        for cmd in &parsed.processed {
            let Some(entry) = cmd.as_group_service() else { continue };
            if cmd.skip {
                continue;
            }
            let mut group = NormalizedObject::new(
                entry.group.as_str(),
                ObjectKind::ServiceGroup {
                    members: Vec::new(),
                },
            );
            group.comment = cmd.comment.clone();
            for child in cmd.children.iter().filter(|c| !c.skip) {
                let Some(member) = child.as_group_service() else { continue };
                if !member.member.is_empty() {
                    let resolved = match self.services.get(&member.member) {
                        Some(name) => name.clone(),
                        None => self.predefined_service_or_group(&member.member),
                    };
                    group.add_member(&resolved);
                }
                if group.comment.is_empty() && !child.comment.is_empty() {
                    group.comment = child.comment.clone();
                }
                self.apply_incident(&mut group, child);
            }
            group.line_id = cmd.id;
            self.check_name(&mut group, Some(cmd));
            self.services.insert(entry.group.clone(), group.name.clone());
            self.store.add(group);
        }
    }

    /// Materialize a ScreenOS predefined service or group on first use.
    ///
    /// Returns the converted name, or `name` itself when the knowledge base
    /// does not know it.
    pub(super) fn predefined_service_or_group(&mut self, name: &str) -> String {
        let knowledge = self.knowledge;
        let Some(members) = knowledge.group_members(name) else {
            return self.predefined_service(name);
        };
        let mut group = NormalizedObject::new(
            naming::service_group(name),
            ObjectKind::ServiceGroup {
                members: Vec::new(),
            },
        );
        for member in members {
            let resolved = self.predefined_service(member);
            group.add_member(&resolved);
        }
        self.check_name(&mut group, None);
        self.services.insert(name.to_string(), group.name.clone());
        let resolved = group.name.clone();
        self.store.add(group);
        resolved
    }

    fn predefined_service(&mut self, name: &str) -> String {
        if let Some(resolved) = self.services.get(name) {
            return resolved.clone();
        }
        let knowledge = self.knowledge;
        let ports = knowledge.service_ports(name);
        match ports {
            [] => name.to_string(),
            [port] => match knowledge.target_service_for(port) {
                Some(target) => target.to_string(),
                None => self.service_by_port_key(name, port),
            },
            _ => {
                let mut group = NormalizedObject::new(
                    naming::service_group(name),
                    ObjectKind::ServiceGroup {
                        members: Vec::new(),
                    },
                );
                for port in ports {
                    let member = match knowledge.target_service_for(port) {
                        Some(target) => target.to_string(),
                        None => self.service_by_port_key(name, port),
                    };
                    group.add_member(&member);
                }
                self.check_name(&mut group, None);
                self.services.insert(name.to_string(), group.name.clone());
                let resolved = group.name.clone();
                self.store.add(group);
                resolved
            }
        }
    }

    /// Create a custom service from a `<PROTO>_<value>` port key.
    pub(super) fn service_by_port_key(&mut self, name: &str, key: &str) -> String {
        let Some((proto, value)) = key.split_once('_') else {
            return name.to_string();
        };
        let (fragment, kind) = match proto {
            "TCP" => (
                format!("tcp_any_{value}"),
                ObjectKind::TcpService {
                    port: value.to_string(),
                    timeout: 0,
                },
            ),
            "UDP" => (
                format!("udp_any_{value}"),
                ObjectKind::UdpService {
                    port: value.to_string(),
                    timeout: 0,
                },
            ),
            "OTHER" => (
                format!("ip_{value}"),
                ObjectKind::OtherService {
                    protocol: value.to_string(),
                    timeout: 0,
                },
            ),
            "ICMP" => {
                let Some((icmp_type, code)) = value.split_once('_') else {
                    return name.to_string();
                };
                let (Ok(icmp_type), Ok(code)) = (icmp_type.parse::<u8>(), code.parse::<u8>())
                else {
                    return name.to_string();
                };
                (
                    format!("icmp_T{icmp_type}_C{code}"),
                    ObjectKind::IcmpService { icmp_type, code },
                )
            }
            "MS-RPC" => (
                format!("ms-rpc_U{value}"),
                ObjectKind::DceRpcService {
                    uuid: value.to_string(),
                },
            ),
            "SUN-RPC" => (
                format!("sun-rpc_P{value}"),
                ObjectKind::RpcService {
                    program: value.to_string(),
                },
            ),
            _ => return name.to_string(),
        };
        let service_name = naming::service(&fragment, name);
        if self.store.contains(&service_name) {
            return service_name;
        }
        let mut object = NormalizedObject::new(service_name, kind);
        self.check_name(&mut object, None);
        self.services.insert(name.to_string(), object.name.clone());
        let resolved = object.name.clone();
        self.store.add(object);
        resolved
    }

    /// Converted service for a ScreenOS name, materializing predefined
    /// services when needed. `None` when nothing of that name exists.
    pub(super) fn service_by_name(&mut self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        if !self.services.contains_key(name) {
            self.predefined_service_or_group(name);
        }
        self.services
            .get(name)
            .filter(|resolved| self.store.contains(resolved))
            .cloned()
    }

    /// Port-key protocol of a converted service: `TCP`, `UDP`, `OTHER`,
    /// `ICMP`, `RPC`, `DCERPC`, `GROUP`, or empty when unknown.
    pub(super) fn service_type(&self, converted: &str, screenos: &str) -> String {
        if self.store.is_predefined(converted) {
            return match self.knowledge.service_ports(screenos) {
                [] => String::new(),
                [port] => port
                    .split_once('_')
                    .map(|(proto, _)| proto.to_string())
                    .unwrap_or_default(),
                _ => "GROUP".to_string(),
            };
        }
        let label = match self.store.get(converted).map(|o| &o.kind) {
            Some(ObjectKind::TcpService { .. }) => "TCP",
            Some(ObjectKind::UdpService { .. }) => "UDP",
            Some(ObjectKind::OtherService { .. }) => "OTHER",
            Some(ObjectKind::IcmpService { .. }) => "ICMP",
            Some(ObjectKind::RpcService { .. }) => "RPC",
            Some(ObjectKind::DceRpcService { .. }) => "DCERPC",
            Some(ObjectKind::ServiceGroup { .. }) => "GROUP",
            _ => "",
        };
        label.to_string()
    }

    /// Existing service on `port` of protocol `proto`, predefined first.
    pub(super) fn service_on_port(&self, proto: &str, port: u32) -> Option<String> {
        let key = format!("{proto}_{port}");
        if let Some(target) = self.knowledge.target_service_for(&key) {
            return Some(target.to_string());
        }
        self.store.find_service_by_key(&key).map(|o| o.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::convert::{convert, ConvertOptions};
    use crate::knowledge::default_knowledge;
    use crate::model::{ConversionResult, ObjectKind};
    use screenos_core::Severity;

    fn run(text: &str) -> ConversionResult {
        let parsed = screenos_core::parse(text).expect("parse");
        convert(&parsed, &default_knowledge(), &ConvertOptions::default())
    }

    #[test]
    fn single_protocol_service() {
        let result = run("set service \"app\" protocol tcp src-port 0-65535 dst-port 8443-8443 timeout 30\n");
        let object = result
            .object("Service_SM_tcp_any_8443_app")
            .expect("service");
        assert_eq!(
            object.kind,
            ObjectKind::TcpService {
                port: "8443".into(),
                timeout: 1800
            }
        );
    }

    #[test]
    fn multi_protocol_service_becomes_group() {
        let result = run(concat!(
            "set service \"app\" protocol tcp src-port 0-65535 dst-port 8443-8443\n",
            "set service \"app\" + udp src-port 0-65535 dst-port 8443-8443\n",
        ));
        let group = result.object("GRP_SM_Service_app").expect("group");
        assert_eq!(
            group.members(),
            ["Service_SM_tcp_any_8443_app", "Service_SM_udp_any_8443_app"]
        );
    }

    #[test]
    fn predefined_port_uses_target_service() {
        let result = run("set service \"web-alt\" protocol tcp src-port 0-65535 dst-port 80-80\n");
        assert!(result.objects.iter().all(|o| !o.kind.is_service()));
        let incident = &result.incidents[0];
        assert_eq!(incident.severity, Severity::Informative);
        assert!(incident.description.ends_with("Predefined service name: http."));
    }

    #[test]
    fn service_group_resolves_members() {
        let result = run(concat!(
            "set service \"app\" protocol tcp src-port 0-65535 dst-port 8443-8443\n",
            "set group service \"apps\"\n",
            "set group service \"apps\" add \"app\"\n",
            "set group service \"apps\" add \"HTTP\"\n",
        ));
        let group = result.object("apps").expect("group");
        assert_eq!(group.members(), ["Service_SM_tcp_any_8443_app", "http"]);
    }
}
