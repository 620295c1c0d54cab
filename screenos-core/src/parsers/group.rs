use crate::command::{Command, CommandKind, GroupAddress, GroupService};
use crate::incident::Severity;
use crate::tokenizer::unquote;

/// `set group address <zone> <group> [add <member> | comment <text>]`.
pub fn parse_group_address(cmd: &mut Command) {
    cmd.known = true;
    let mut group = GroupAddress::default();
    if super::base_parse(cmd) {
        let tokens = cmd.tokens.clone();
        group.zone = unquote(tokens.token_at(3)).to_string();
        group.group = unquote(tokens.token_at(4)).to_string();
        if tokens.len() > 5 {
            match tokens.token_at(5) {
                "add" => group.member = unquote(tokens.token_at(6)).to_string(),
                "comment" => cmd.comment = unquote(tokens.token_at(6)).to_string(),
                _ => cmd.skip = true,
            }
        }
    }
    cmd.kind = CommandKind::GroupAddress(group);
}

/// `set group service <group> [add <member> | comment <text>]`.
pub fn parse_group_service(cmd: &mut Command) {
    cmd.known = true;
    let mut group = GroupService::default();
    if super::base_parse(cmd) {
        let tokens = cmd.tokens.clone();
        group.group = unquote(tokens.token_at(3)).to_string();
        if tokens.len() > 4 {
            match tokens.token_at(4) {
                "add" => group.member = unquote(tokens.token_at(5)).to_string(),
                "comment" => cmd.comment = unquote(tokens.token_at(5)).to_string(),
                _ => cmd.set_incident(
                    Severity::ManualActionRequired,
                    "Unknown format of group service object",
                ),
            }
        }
    }
    cmd.kind = CommandKind::GroupService(group);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_address_head_and_members() {
        let mut head = Command::new(1, r#"set group address "Trust" "servers""#);
        parse_group_address(&mut head);
        let g = head.as_group_address().expect("group");
        assert_eq!((g.zone.as_str(), g.group.as_str(), g.member.as_str()), ("Trust", "servers", ""));

        let mut add = Command::new(2, r#"set group address "Trust" "servers" add "srv1""#);
        parse_group_address(&mut add);
        assert_eq!(add.as_group_address().expect("group").member, "srv1");

        let mut comment = Command::new(3, r#"set group address "Trust" "servers" comment "all""#);
        parse_group_address(&mut comment);
        assert_eq!(comment.comment, "all");

        let mut hidden = Command::new(4, r#"set group address "Trust" "servers" hidden"#);
        parse_group_address(&mut hidden);
        assert!(hidden.skip);
    }

    #[test]
    fn group_service_unknown_verb_requires_action() {
        let mut cmd = Command::new(1, r#"set group service "web" remove "HTTP""#);
        parse_group_service(&mut cmd);
        assert_eq!(cmd.incident, Severity::ManualActionRequired);
        assert!(!cmd.skip);

        let mut add = Command::new(2, r#"set group service "web" add "HTTP""#);
        parse_group_service(&mut add);
        let g = add.as_group_service().expect("group");
        assert_eq!((g.group.as_str(), g.member.as_str()), ("web", "HTTP"));
    }
}
