use crate::command::{Command, CommandKind, Service, TimeoutUnit};
use crate::incident::Severity;
use crate::protocol::ServiceProtocol;
use crate::tokenizer::unquote;

/// Timeout recorded for `timeout never`.
pub const NEVER_TIMEOUT: u32 = 2160;

/// `set service <name> (protocol|+) <clause> [session-cache] [timeout ...]`.
///
/// A line with nothing recognisable after the name is a service reference
/// inside a policy body.
pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut svc = Service::default();
    if super::base_parse(cmd) {
        parse_body(cmd, &mut svc);
    }
    cmd.kind = CommandKind::Service(svc);
}

fn parse_body(cmd: &mut Command, svc: &mut Service) {
    let tokens = cmd.tokens.clone();
    svc.name = unquote(tokens.token_at(2)).to_string();

    let mut index = 3;
    let mut word = tokens.token_at(index);
    if !matches!(word, "protocol" | "+" | "session-cache" | "timeout") {
        svc.policy_context = true;
        return;
    }

    if word == "protocol" || word == "+" {
        index += 1;
        match ServiceProtocol::parse(&tokens, index) {
            Some((protocol, next)) => {
                svc.protocol = Some(protocol);
                index = next;
            }
            None => {
                cmd.skip = true;
                return;
            }
        }
        word = tokens.token_at(index);
    }

    let mut option = "";
    if word == "session-cache" {
        option = "session-cache";
        svc.session_cache = true;
        index += 1;
        word = tokens.token_at(index);
    }

    if word == "timeout" {
        option = "timeout";
        index += 1;
        match tokens.token_at(index) {
            "unit" => {
                index += 1;
                if tokens.token_at(index) == "10sec" {
                    svc.timeout_unit = TimeoutUnit::TenSeconds;
                }
            }
            "never" => svc.timeout = NEVER_TIMEOUT,
            other => match other.parse::<u32>() {
                Ok(minutes) => svc.timeout = minutes,
                Err(_) => cmd.skip = true,
            },
        }
    }

    let mut messages = Vec::new();
    if !option.is_empty() {
        messages.push(format!(
            "ScreenOS service object option \"{option}\" is not supported. Ignoring this part of object"
        ));
    }
    if let Some(protocol) = &svc.protocol {
        if !protocol.incident_message().is_empty() {
            messages.push(protocol.incident_message().to_string());
        }
    }
    if !messages.is_empty() {
        cmd.set_incident(Severity::Informative, messages.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Command {
        let mut cmd = Command::new(7, line);
        parse(&mut cmd);
        cmd
    }

    #[test]
    fn protocol_clause() {
        let cmd = parsed(r#"set service "web8080" protocol tcp src-port 0-65535 dst-port 8080-8080"#);
        let svc = cmd.as_service().expect("service");
        assert_eq!(svc.name, "web8080");
        assert!(!svc.policy_context);
        let protocol = svc.protocol.as_ref().expect("protocol");
        assert_eq!(protocol.port_key(), "TCP_8080");
        assert_eq!(cmd.incident, Severity::None);
    }

    #[test]
    fn continuation_with_plus() {
        let cmd = parsed(r#"set service "dns" + udp src-port 0-65535 dst-port 53-53"#);
        let svc = cmd.as_service().expect("service");
        assert_eq!(svc.protocol.as_ref().expect("protocol").port_key(), "UDP_53");
    }

    #[test]
    fn policy_body_reference() {
        let cmd = parsed(r#"set service "HTTP""#);
        assert!(cmd.as_service().expect("service").policy_context);
        assert!(!cmd.skip);
    }

    #[test]
    fn timeout_options() {
        let never = parsed(r#"set service "long" protocol tcp src-port 0-65535 dst-port 22-22 timeout never"#);
        let svc = never.as_service().expect("service");
        assert_eq!(svc.timeout, NEVER_TIMEOUT);
        assert_eq!(never.incident, Severity::Informative);
        assert!(never.incident_message.contains("option \"timeout\""));

        let unit = parsed(r#"set service "fast" timeout unit 10sec"#);
        assert_eq!(unit.as_service().expect("service").timeout_unit, TimeoutUnit::TenSeconds);

        let bad = parsed(r#"set service "x" timeout soon"#);
        assert!(bad.skip);
    }

    #[test]
    fn session_cache_and_protocol_messages_join() {
        let cmd = parsed(
            r#"set service "sc" protocol tcp src-port 1000-1000 dst-port 80-80 session-cache"#,
        );
        let lines: Vec<&str> = cmd.incident_message.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("session-cache"));
        assert!(lines[1].contains("source port"));
    }

    #[test]
    fn unknown_protocol_is_skipped() {
        let cmd = parsed(r#"set service "x" protocol gre"#);
        assert!(cmd.skip);
    }
}
