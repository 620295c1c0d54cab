//! Interface NAT definitions and DIP groups.
//!
//! DIP, MIP and VIP clauses are anchored on the position of their keyword
//! because optional tokens such as `ext ip <a> <m>` may precede it.

use crate::command::{
    Command, CommandKind, GroupNatDip, InterfaceNatDip, InterfaceNatMip, InterfaceNatVip, VipData,
};
use crate::incident::Severity;
use crate::netutil;
use crate::tokenizer::{unquote, Tokens};

/// Earliest position a NAT keyword may appear at.
const NAT_KEYWORD_MIN: usize = 3;

/// Result of parsing an interface NAT clause.
pub(crate) struct NatOutcome<T> {
    pub nat: T,
    pub skip: bool,
    pub incident: Severity,
    pub message: String,
}

impl<T> NatOutcome<T> {
    fn new(nat: T) -> Self {
        Self {
            nat,
            skip: false,
            incident: Severity::None,
            message: String::new(),
        }
    }

    fn fail(mut self, severity: Severity, message: String) -> Self {
        self.incident = severity;
        self.message = message;
        self
    }

    fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// `... dip <id> [shift-from <ip> to] <start> <end> [fix-port] ...`.
pub(crate) fn parse_dip(tokens: &Tokens) -> NatOutcome<InterfaceNatDip> {
    let mut out = NatOutcome::new(InterfaceNatDip::new());
    let pos = match tokens.position_of("dip") {
        Some(pos) if pos >= NAT_KEYWORD_MIN => pos,
        _ => return out.skipped(),
    };

    let mut unsupported = String::new();
    if pos != NAT_KEYWORD_MIN {
        unsupported = format!(
            "{}, ",
            tokens.tokens_range(NAT_KEYWORD_MIN, pos - NAT_KEYWORD_MIN).join(" ")
        );
    }

    let mut idx = pos + 1;
    match tokens.token_at(idx) {
        "interface-ip" => return out.skipped(),
        word => {
            if let Ok(id) = word.parse::<u32>() {
                out.nat.dip_id = id;
            }
        }
    }

    idx += 1;
    if tokens.token_at(idx) == "shift-from" {
        idx += 1;
        out.nat.shift_from = tokens.token_at(idx).to_string();
        idx += 2;
    }
    out.nat.ip_start = tokens.token_at(idx).to_string();
    idx += 1;
    out.nat.ip_end = tokens.token_at(idx).to_string();

    for word in tokens.tokens_from(idx + 1) {
        if word == "fix-port" {
            out.nat.set_pat(false);
        } else {
            unsupported.push_str(word);
            unsupported.push(' ');
        }
    }

    if !unsupported.is_empty() {
        out.incident = Severity::Informative;
        out.message = format!(
            "ScreenOS interface object with DIP instruction, option \"{unsupported}\" is not supported. Ignoring this part of object"
        );
    }
    out
}

/// `... mip <ip> host <ip> netmask <mask> [vr <name>]`.
pub(crate) fn parse_mip(tokens: &Tokens) -> NatOutcome<InterfaceNatMip> {
    let mut out = NatOutcome::new(InterfaceNatMip::default());
    let pos = match tokens.position_of("mip") {
        Some(pos) if pos >= NAT_KEYWORD_MIN => pos,
        _ => return out.skipped(),
    };
    let unsupported = |option: &str| {
        format!("ScreenOS interface object with MIP instruction, option {option} is not supported. Ignoring command")
    };

    let mip = tokens.token_at(pos + 1);
    if !netutil::is_valid_ipv4(mip) {
        return out.fail(Severity::ManualActionRequired, unsupported(mip));
    }
    out.nat.mip = mip.to_string();

    let ip = tokens.token_at(pos + 3);
    if !netutil::is_valid_ipv4(ip) {
        return out.fail(Severity::ManualActionRequired, unsupported(ip));
    }
    out.nat.ip = ip.to_string();

    let mask = tokens.token_at(pos + 5);
    if !netutil::is_valid_netmask(mask) {
        return out.fail(Severity::ManualActionRequired, unsupported(mask));
    }
    out.nat.mask = mask.to_string();

    let mut idx = pos + 6;
    if tokens.token_at(idx) == "vr" {
        out.nat.vr_name = unquote(tokens.token_at(idx + 1)).to_string();
        idx += 2;
    }
    if !tokens.token_at(idx).is_empty() {
        let rest = tokens.tokens_from(idx).join(" ");
        out.incident = Severity::ManualActionRequired;
        out.message = format!(
            "ScreenOS interface object with MIP instruction, option {rest} is not supported. Ignoring this command"
        );
    }
    out
}

/// `... vip (<ip>|interface-ip) [+] <port> <service> <ip>`.
pub(crate) fn parse_vip(tokens: &Tokens) -> NatOutcome<InterfaceNatVip> {
    let mut out = NatOutcome::new(InterfaceNatVip::default());
    let pos = match tokens.position_of("vip") {
        Some(pos) if pos >= NAT_KEYWORD_MIN => pos,
        _ => return out.skipped(),
    };

    let mut idx = pos + 1;
    match tokens.token_at(idx) {
        "interface-ip" => out.nat.use_interface_ip = true,
        vip => out.nat.vip = vip.to_string(),
    }

    idx += 1;
    if tokens.token_at(idx) == "+" {
        idx += 1;
    }
    let word = tokens.token_at(idx);
    if word == "port-range" {
        return out.fail(
            Severity::ManualActionRequired,
            "ScreenOS interface object with VIP instruction, option \"port-range\" is not supported"
                .to_string(),
        );
    }
    let Ok(src_port) = word.parse::<u32>() else {
        return out.fail(
            Severity::ManualActionRequired,
            format!("ScreenOS interface object with VIP instruction, option \"{word}\" is not supported"),
        );
    };

    out.nat.data = Some(VipData {
        src_port,
        dest_service_name: unquote(tokens.token_at(idx + 1)).to_string(),
        dest_ip: tokens.token_at(idx + 2).to_string(),
    });

    idx += 3;
    if !tokens.token_at(idx).is_empty() {
        let rest = tokens.tokens_from(idx).join(" ");
        out.incident = Severity::Informative;
        out.message = format!(
            "ScreenOS interface object with VIP instruction, option \"{rest}\" is not supported. Ignoring this part of object"
        );
    }
    out
}

/// `set dip group <id> [member <id>]`.
pub fn parse_group_dip(cmd: &mut Command) {
    cmd.known = true;
    let mut group = GroupNatDip::default();
    if super::base_parse(cmd) {
        let tokens = cmd.tokens.clone();
        match tokens.token_at(3).parse::<u32>() {
            Ok(id) => {
                group.group_id = id;
                let mut idx = 4;
                if tokens.token_at(idx) == "member" {
                    idx += 1;
                    group.member = tokens.token_at(idx).parse().unwrap_or(0);
                }
                idx += 1;
                if !tokens.token_at(idx).is_empty() {
                    let rest = tokens.tokens_from(idx).join(" ");
                    cmd.set_incident(
                        Severity::Informative,
                        format!("ScreenOS DIP object option \"{rest}\" is not supported. Ignoring this part of object"),
                    );
                }
            }
            Err(_) => cmd.skip = true,
        }
    }
    cmd.kind = CommandKind::GroupNatDip(group);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dip_with_range_and_fix_port() {
        let t = Tokens::new(r#"set interface "ethernet0/2" dip 5 1.1.1.10 1.1.1.20 fix-port"#);
        let out = parse_dip(&t);
        assert!(!out.skip);
        assert_eq!(out.nat.dip_id, 5);
        assert_eq!(out.nat.ip_start, "1.1.1.10");
        assert_eq!(out.nat.ip_end, "1.1.1.20");
        assert!(!out.nat.pat());
        assert_eq!(out.incident, Severity::None);
    }

    #[test]
    fn dip_shift_and_leading_options() {
        let t = Tokens::new(
            r#"set interface "ethernet0/2" ext ip 2.2.2.1 255.255.255.0 dip 6 shift-from 10.0.0.1 to 2.2.2.10 2.2.2.20 scale-size 2"#,
        );
        let out = parse_dip(&t);
        assert_eq!(out.nat.dip_id, 6);
        assert_eq!(out.nat.shift_from, "10.0.0.1");
        assert_eq!(out.nat.ip_start, "2.2.2.10");
        assert!(!out.nat.pat());
        assert_eq!(out.incident, Severity::Informative);
        assert!(out
            .message
            .contains("\"ext ip 2.2.2.1 255.255.255.0, scale-size 2 \""));
    }

    #[test]
    fn dip_interface_ip_is_skipped() {
        let t = Tokens::new(r#"set interface "ethernet0/2" dip interface-ip incoming"#);
        assert!(parse_dip(&t).skip);
    }

    #[test]
    fn mip_host_and_bad_mask() {
        let t = Tokens::new(
            r#"set interface "ethernet0/0" mip 1.1.1.5 host 10.0.0.5 netmask 255.255.255.255 vr "trust-vr""#,
        );
        let out = parse_mip(&t);
        assert_eq!(out.incident, Severity::None);
        assert_eq!(out.nat.reference_name(), "MIP(1.1.1.5)");
        assert_eq!(out.nat.vr_name, "trust-vr");

        let bad = Tokens::new(r#"set interface "ethernet0/0" mip 1.1.1.5 host 10.0.0.5 netmask 0.0.0.255"#);
        let out = parse_mip(&bad);
        assert_eq!(out.incident, Severity::ManualActionRequired);
        assert!(out.message.contains("option 0.0.0.255"));
    }

    #[test]
    fn vip_forms() {
        let t = Tokens::new(r#"set interface "ethernet0/0" vip 1.1.1.6 + 8080 "HTTP" 10.0.0.6"#);
        let out = parse_vip(&t);
        let data = out.nat.data.expect("vip data");
        assert_eq!(data.src_port, 8080);
        assert_eq!(data.dest_service_name, "HTTP");
        assert_eq!(data.dest_ip, "10.0.0.6");

        let iface = Tokens::new(r#"set interface "ethernet0/0" vip interface-ip 80 "HTTP" 10.0.0.7 manual"#);
        let out = parse_vip(&iface);
        assert!(out.nat.use_interface_ip);
        assert_eq!(out.incident, Severity::Informative);

        let range = Tokens::new(r#"set interface "ethernet0/0" vip 1.1.1.6 port-range 80 90"#);
        let out = parse_vip(&range);
        assert_eq!(out.incident, Severity::ManualActionRequired);
        assert!(out.nat.data.is_none());
    }

    #[test]
    fn dip_group_head_and_member() {
        let mut head = Command::new(1, "set dip group 10");
        parse_group_dip(&mut head);
        assert_eq!(head.as_group_dip().expect("group").group_id, 10);
        assert_eq!(head.as_group_dip().expect("group").member, 0);

        let mut member = Command::new(2, "set dip group 10 member 5");
        parse_group_dip(&mut member);
        assert_eq!(member.as_group_dip().expect("group").member, 5);
        assert_eq!(member.incident, Severity::None);

        let mut extra = Command::new(3, "set dip group 10 member 5 sticky");
        parse_group_dip(&mut extra);
        assert_eq!(extra.incident, Severity::Informative);

        let mut bad = Command::new(4, "set dip group abc");
        parse_group_dip(&mut bad);
        assert!(bad.skip);
    }
}
