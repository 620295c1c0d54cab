use crate::command::{Command, CommandKind, Route};
use crate::incident::Severity;
use crate::netutil;
use crate::tokenizer::unquote;

/// `set route <net>/<len> [interface <if>] [gateway <ip>] [description <text>]
/// [metric <n>] [permanent]`.
pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut route = Route::default();
    if super::base_parse(cmd) {
        parse_body(cmd, &mut route);
    }
    cmd.kind = CommandKind::Route(route);
}

fn parse_body(cmd: &mut Command, route: &mut Route) {
    let tokens = cmd.tokens.clone();
    let Some((network, len)) = netutil::split_cidr(tokens.token_at(2)) else {
        cmd.set_incident(
            Severity::ManualActionRequired,
            "ScreenOS route object network and mask should represented as A.B.C.D/Mask-Length. Ignoring this command",
        );
        return;
    };
    route.network = network.to_string();
    route.mask = netutil::length_to_netmask(len);
    if !netutil::is_valid_ipv4(network) {
        cmd.set_incident(
            Severity::ManualActionRequired,
            "ScreenOS route object network or mask is invalid. Ignoring this command",
        );
        return;
    }

    let mut idx = 3;
    while idx < tokens.len() {
        match tokens.token_at(idx) {
            "interface" => {
                idx += 1;
                route.interface = unquote(tokens.token_at(idx)).to_string();
            }
            "gateway" => {
                idx += 1;
                route.gateway = tokens.token_at(idx).to_string();
            }
            "description" => {
                idx += 1;
                route.description = unquote(tokens.token_at(idx)).to_string();
            }
            "metric" => {
                idx += 1;
                route.metric = tokens.token_at(idx).parse().ok();
            }
            "permanent" => route.permanent = true,
            _ => {}
        }
        idx += 1;
    }

    if route.interface.is_empty() && route.gateway.is_empty() {
        cmd.skip = true;
    }
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
    fn default_route_with_gateway() {
        let cmd = parsed(r#"set route 0.0.0.0/0 interface ethernet0/0 gateway 1.1.1.254 metric 5 permanent"#);
        let r = cmd.as_route().expect("route");
        assert!(r.is_default_route());
        assert_eq!(r.interface, "ethernet0/0");
        assert_eq!(r.gateway, "1.1.1.254");
        assert_eq!(r.metric, Some(5));
        assert!(r.permanent);
        assert!(!cmd.skip);
    }

    #[test]
    fn route_without_next_hop_is_skipped() {
        assert!(parsed("set route 10.0.0.0/8 description \"lab\"").skip);
    }

    #[test]
    fn malformed_routes_require_action() {
        let no_len = parsed("set route 10.0.0.0 255.0.0.0 gateway 1.1.1.1");
        assert_eq!(no_len.incident, Severity::ManualActionRequired);
        assert!(no_len.incident_message.contains("A.B.C.D/Mask-Length"));

        let bad_ip = parsed("set route 10.0.0/8 gateway 1.1.1.1");
        assert!(bad_ip.incident_message.contains("invalid"));
    }
}
