use crate::command::{Address, AddressType, Command, CommandKind};
use crate::incident::Severity;
use crate::netutil;
use crate::tokenizer::{is_quoted, unquote};

/// `set address <zone> <name> <ip> <mask> ["comment"]`
/// or `set address <zone> <name> <fqdn> ["comment"]`.
pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut addr = Address::default();
    if !super::base_parse(cmd) {
        cmd.kind = CommandKind::Address(addr);
        return;
    }

    let tokens = cmd.tokens.clone();
    addr.zone = unquote(tokens.token_at(2)).to_string();
    addr.name = unquote(tokens.token_at(3)).to_string();

    let mask = tokens.token_at(5).to_string();
    if netutil::is_valid_netmask(&mask) || netutil::is_wildcard_mask(&mask) {
        addr.netmask = if netutil::is_valid_netmask(&mask) {
            mask
        } else {
            netutil::wildcard_to_netmask(&mask)
        };
        if netutil::mask_length(&addr.netmask) == 32 {
            addr.address_type = AddressType::Host;
            addr.ip = tokens.token_at(4).to_string();
        } else {
            addr.address_type = AddressType::Network;
            addr.ip = netutil::network_of(tokens.token_at(4), &addr.netmask);
        }
    } else if netutil::is_valid_ipv4(&mask) {
        addr.address_type = AddressType::Network;
        addr.ip = "1.1.1.0".to_string();
        addr.netmask = "255.255.255.0".to_string();
        cmd.set_incident(
            Severity::ManualActionRequired,
            format!(
                "ScreenOS address object with complex wildcard mask {mask} is not supported. Using subnet 1.1.1.0/255.255.255.0"
            ),
        );
    } else if mask.is_empty() || is_quoted(&mask) {
        addr.address_type = AddressType::Domain;
        addr.domain = tokens.token_at(4).to_string();
    } else {
        cmd.known = false;
        cmd.incident_message = format!("Unknown format of {mask} Network Mask");
    }

    let last = tokens.len().saturating_sub(1);
    if last >= 5 && is_quoted(tokens.token_at(last)) {
        cmd.comment = unquote(tokens.token_at(last)).to_string();
    }
    cmd.kind = CommandKind::Address(addr);
}
