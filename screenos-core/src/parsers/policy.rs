//! `set policy` statements.
//!
//! ## Layout
//!
//! ```text
//! set policy [global] id <n> [name "<x>"] from <zone> to <zone> <src> <dst> <svc>
//!     [nat src [dip-id <n>] | nat [src [dip-id <n>]] dst ip <a> [<b>] [port <n>]]
//!     <permit|reject|deny|tunnel> [log] [...]
//! ```
//!
//! `set policy id <n>` alone opens a policy body that runs until `exit`.
//! `disable`, `application` and `default-permit-all` end parsing immediately.

use crate::command::{Command, CommandKind, Policy, PolicyAction, PolicyNatType};
use crate::incident::Severity;
use crate::netutil;
use crate::tokenizer::{unquote, Tokens};

/// Position of the first token after `set policy`.
const FIRST_CLAUSE: usize = 2;
/// Clause tokens always present before the object triple: `id <n> from <z> to <z>`.
const CLAUSE_SPAN: usize = 7;

pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut policy = Policy::default();
    if super::base_parse(cmd) {
        parse_body(cmd, &mut policy);
    }
    cmd.kind = CommandKind::Policy(policy);
}

fn parse_body(cmd: &mut Command, policy: &mut Policy) {
    let tokens = cmd.tokens.clone();
    let mut i = FIRST_CLAUSE;
    let mut name_extension = 0;
    let mut global_extension = 0;

    loop {
        let word = tokens.token_at(i);
        match word {
            "global" => {
                policy.global = true;
                global_extension = 1;
            }
            "id" => {
                i += 1;
                policy.id = tokens.token_at(i).parse().unwrap_or(0);
            }
            "name" => {
                i += 1;
                policy.name = unquote(tokens.token_at(i)).to_string();
                name_extension = 2;
            }
            "from" => {
                i += 1;
                policy.src_zone = unquote(tokens.token_at(i)).to_string();
            }
            "to" => {
                i += 1;
                policy.dst_zone = unquote(tokens.token_at(i)).to_string();
            }
            "disable" => {
                policy.disabled = true;
                return;
            }
            "application" => {
                cmd.skip = true;
                return;
            }
            "default-permit-all" => {
                policy.default_permit_all = true;
                return;
            }
            _ => {
                // `set policy id <n>` opens a policy body.
                let body_header = word.is_empty() && i == 4 && policy.id != 0;
                if !body_header {
                    cmd.known = false;
                    cmd.incident_message =
                        "Unknown format of policy object. Ignoring this command".to_string();
                }
                return;
            }
        }
        i += 1;
        if i >= CLAUSE_SPAN + name_extension + global_extension || word.is_empty() {
            break;
        }
    }

    policy.src_object = tokens.token_at(i).to_string();
    policy.dst_object = tokens.token_at(i + 1).to_string();
    policy.service = tokens.token_at(i + 2).to_string();
    i += 3;

    policy.nat_type = PolicyNatType::from_destination(&policy.dst_object);

    let mut word = tokens.token_at(i);
    i += 1;
    if word == "nat" {
        let (nat_type, next) = parse_nat_clause(&tokens, i, policy);
        if policy.nat_type != PolicyNatType::Policy {
            policy.mixed_nat = true;
        } else {
            policy.nat_type = nat_type;
        }
        i = next;
        word = tokens.token_at(i);
        i += 1;
    }

    let mut unsupported: Vec<&str> = Vec::new();
    policy.action = match word {
        "permit" => PolicyAction::Permit,
        "reject" => PolicyAction::Reject,
        "deny" => PolicyAction::Deny,
        "tunnel" => {
            policy.nat_type = PolicyNatType::Na;
            cmd.skip = true;
            return;
        }
        other => {
            unsupported.push(other);
            PolicyAction::Na
        }
    };

    for word in tokens.tokens_from(i) {
        match word.as_str() {
            "log" => policy.log = true,
            other => unsupported.push(other),
        }
    }

    if !unsupported.is_empty() {
        let options: String = unsupported.iter().map(|w| format!("{w} ")).collect();
        cmd.set_incident(
            Severity::Informative,
            format!(
                "ScreenOS policy object option \"{options}\" is not supported. Ignoring this part of object"
            ),
        );
    }
}

/// Parse the clause after `nat`, returning its NAT type and the index of
/// the next unread token.
fn parse_nat_clause(tokens: &Tokens, start: usize, policy: &mut Policy) -> (PolicyNatType, usize) {
    let mut nat_type = PolicyNatType::Na;
    let mut idx = start;

    if tokens.token_at(idx) == "src" {
        nat_type = PolicyNatType::Dip;
        idx += 1;
        if tokens.token_at(idx) == "dip-id" {
            idx += 1;
            policy.dip_id = tokens.token_at(idx).parse().unwrap_or(0);
            idx += 1;
        }
    }

    if tokens.token_at(idx) == "dst" {
        nat_type = if nat_type == PolicyNatType::Dip {
            PolicyNatType::PolicyBaseSrcDest
        } else {
            PolicyNatType::PolicyBaseDest
        };
        // skip `dst ip`
        idx += 2;
        policy.dest_nat_ips = vec![tokens.token_at(idx).to_string()];
        idx += 1;
        if netutil::is_valid_ipv4(tokens.token_at(idx)) {
            policy.dest_nat_ips.push(tokens.token_at(idx).to_string());
            idx += 1;
        }
        if tokens.token_at(idx) == "port" {
            idx += 1;
            policy.dest_nat_port = tokens.token_at(idx).parse().unwrap_or(0);
            idx += 1;
        }
    }

    (nat_type, idx)
}
