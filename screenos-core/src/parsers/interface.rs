use crate::command::{Command, CommandKind, Interface, InterfaceNat, InterfaceType};
use crate::incident::Severity;
use crate::netutil;
use crate::tokenizer::unquote;

use super::nat::{self, NatOutcome};

/// `set interface <name> <sub-type> ...`.
///
/// Only the `ip`, `zone`, `tag`, `nat`, `dip`, `ext`, `mip` and `vip`
/// sub-types are relevant; anything else is skipped.
pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut ifc = Interface::default();
    if super::base_parse(cmd) {
        parse_body(cmd, &mut ifc);
    }
    cmd.kind = CommandKind::Interface(ifc);
}

fn parse_body(cmd: &mut Command, ifc: &mut Interface) {
    let tokens = cmd.tokens.clone();
    let mut zone_index = 3;
    let mut nat_outcome: Option<(Severity, String, bool)> = None;

    match tokens.token_at(3) {
        "ip" => ifc.sub_type = InterfaceType::Ip,
        "zone" => {
            ifc.sub_type = InterfaceType::Zone;
            zone_index += 1;
        }
        "tag" => {
            ifc.sub_type = InterfaceType::Zone;
            zone_index += 3;
        }
        "nat" => ifc.sub_type = InterfaceType::Nat,
        "dip" | "ext" => {
            ifc.sub_type = InterfaceType::Dip;
            let out = nat::parse_dip(&tokens);
            nat_outcome = Some(outcome_state(&out));
            ifc.nat = Some(InterfaceNat::Dip(out.nat));
        }
        "mip" => {
            ifc.sub_type = InterfaceType::Mip;
            let out = nat::parse_mip(&tokens);
            nat_outcome = Some(outcome_state(&out));
            ifc.nat = Some(InterfaceNat::Mip(out.nat));
        }
        "vip" => {
            ifc.sub_type = InterfaceType::Vip;
            let out = nat::parse_vip(&tokens);
            nat_outcome = Some(outcome_state(&out));
            ifc.nat = Some(InterfaceNat::Vip(out.nat));
        }
        _ => {
            cmd.skip = true;
            return;
        }
    }

    ifc.name = unquote(tokens.token_at(2)).to_string();

    match ifc.sub_type {
        InterfaceType::Ip => {
            let address = tokens.token_at(4);
            if let Some((ip, len)) = netutil::split_cidr(address) {
                ifc.ip = ip.to_string();
                ifc.mask = netutil::length_to_netmask(len);
            } else if netutil::is_valid_ipv4(address) {
                ifc.ip = address.to_string();
                ifc.mask = tokens.token_at(5).to_string();
                ifc.secondary = true;
            } else {
                cmd.skip = true;
            }
        }
        InterfaceType::Zone => ifc.zone = unquote(tokens.token_at(zone_index)).to_string(),
        _ => {}
    }

    if let Some((severity, message, skip)) = nat_outcome {
        cmd.incident = severity;
        cmd.incident_message.push_str(&message);
        cmd.skip = skip;
    }
}

fn outcome_state<T>(out: &NatOutcome<T>) -> (Severity, String, bool) {
    (out.incident, out.message.clone(), out.skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Command {
        let mut cmd = Command::new(1, line);
        parse(&mut cmd);
        cmd
    }

    #[test]
    fn zone_and_tag_forms() {
        let zone = parsed(r#"set interface "ethernet0/0" zone "Untrust""#);
        let ifc = zone.as_interface().expect("interface");
        assert_eq!(ifc.sub_type, InterfaceType::Zone);
        assert_eq!(ifc.zone, "Untrust");
        assert_eq!(ifc.name, "ethernet0/0");

        let tag = parsed(r#"set interface "ethernet0/1.10" tag 10 zone "Trust""#);
        assert_eq!(tag.as_interface().expect("interface").zone, "Trust");
    }

    #[test]
    fn ip_forms() {
        let cidr = parsed(r#"set interface ethernet0/0 ip 1.1.1.1/24"#);
        let ifc = cidr.as_interface().expect("interface");
        assert_eq!(ifc.mask, "255.255.255.0");
        assert!(!ifc.secondary);

        let secondary = parsed(r#"set interface ethernet0/0 ip 1.1.2.1 255.255.255.0 secondary"#);
        let ifc = secondary.as_interface().expect("interface");
        assert!(ifc.secondary);
        assert_eq!(ifc.mask, "255.255.255.0");

        assert!(parsed("set interface ethernet0/0 ip manageable").skip);
    }

    #[test]
    fn nat_state_is_copied_up() {
        let mip = parsed(r#"set interface "ethernet0/0" mip 1.1.1.5 host 10.0.0.5 netmask bogus"#);
        assert_eq!(mip.incident, Severity::ManualActionRequired);
        assert!(matches!(
            mip.as_interface().expect("interface").nat,
            Some(InterfaceNat::Mip(_))
        ));

        let dip = parsed(r#"set interface "ethernet0/2" dip interface-ip incoming"#);
        assert!(dip.skip);
    }

    #[test]
    fn irrelevant_sub_types_skip() {
        assert!(parsed(r#"set interface "ethernet0/0" manage ping"#).skip);
        assert!(!parsed(r#"set interface "ethernet0/1" nat"#).skip);
    }
}
