use crate::command::{Command, CommandKind, Zone};
use crate::incident::Severity;
use crate::tokenizer::{is_quoted, unquote};

/// Zones every ScreenOS device ships with.
pub const PREDEFINED_ZONES: &[&str] = &["Trust", "Untrust", "DMZ"];
/// Built-in zones that may be referenced without a `set zone` line.
pub const SPECIAL_ZONES: &[&str] = &[
    "MGT",
    "Null",
    "Untrust-Tun",
    "V1-Null",
    "V1-Trust",
    "V1-Untrust",
    "V1-DMZ",
];
/// Built-in zones that are never converted.
pub const UNSUPPORTED_ZONES: &[&str] = &["HA", "VLAN"];
/// Pseudo zone used by global policies.
pub const GLOBAL_ZONE: &str = "Global";

/// `set zone "<name>" (vrouter <vr> | block)` or `set zone id <n> "<name>"`.
pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut zone = Zone::default();
    if super::base_parse(cmd) {
        parse_body(cmd, &mut zone);
    }
    cmd.kind = CommandKind::Zone(zone);
}

fn parse_body(cmd: &mut Command, zone: &mut Zone) {
    let tokens = cmd.tokens.clone();
    let first = tokens.token_at(2);

    if is_quoted(first) {
        let name = unquote(first);
        if PREDEFINED_ZONES.contains(&name) {
            zone.predefined = true;
        } else if UNSUPPORTED_ZONES.contains(&name) {
            cmd.skip = true;
            return;
        }
        zone.name = name.to_string();
        match tokens.token_at(3) {
            "vrouter" => zone.vrouter = unquote(tokens.token_at(4)).to_string(),
            "block" => {
                zone.blocked = true;
                zone.policy_context = true;
            }
            _ => cmd.skip = true,
        }
    } else if first == "id" {
        let Ok(id) = tokens.token_at(3).parse::<i64>() else {
            cmd.set_incident(Severity::ManualActionRequired, "Id should be a number");
            return;
        };
        zone.id = Some(id);
        let name = tokens.token_at(4);
        if is_quoted(name) {
            zone.name = unquote(name).to_string();
        } else {
            cmd.set_incident(
                Severity::ManualActionRequired,
                "Zone name should be between quotations",
            );
        }
        if !tokens.token_at(5).is_empty() {
            cmd.skip = true;
        }
    } else {
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
    fn predefined_zone_with_vrouter() {
        let cmd = parsed(r#"set zone "Trust" vrouter "trust-vr""#);
        let z = cmd.as_zone().expect("zone");
        assert!(z.predefined);
        assert_eq!(z.vrouter, "trust-vr");
        assert!(!cmd.skip);
    }

    #[test]
    fn blocked_zone_is_policy_context() {
        let cmd = parsed(r#"set zone "Lab" block"#);
        let z = cmd.as_zone().expect("zone");
        assert!(z.blocked && z.policy_context);
    }

    #[test]
    fn id_form() {
        let cmd = parsed(r#"set zone id 100 "Lab""#);
        let z = cmd.as_zone().expect("zone");
        assert_eq!(z.id, Some(100));
        assert_eq!(z.name, "Lab");

        let extra = parsed(r#"set zone id 100 "Lab" extra"#);
        assert!(extra.skip);

        let bad = parsed(r#"set zone id abc "Lab""#);
        assert_eq!(bad.incident_message, "Id should be a number");

        let unquoted = parsed("set zone id 7 Lab");
        assert_eq!(unquoted.incident, Severity::ManualActionRequired);
    }

    #[test]
    fn unsupported_and_other_forms_skip() {
        assert!(parsed(r#"set zone "HA" vrouter "trust-vr""#).skip);
        assert!(parsed(r#"set zone "Trust" tcp-rst"#).skip);
        assert!(parsed("set zone Trust screen alarm-without-drop").skip);
    }
}
