//! Stanza aggregation.
//!
//! ScreenOS spreads one logical object over several lines: an interface is
//! declared by its `zone` line and configured by `ip`, `mip`, `dip` ... lines
//! anywhere in the file, a group gets one `add` line per member and a policy
//! body runs from `set policy id <n>` to `exit`. Aggregation moves those
//! lines under a head command as owned children.
//!
//! ## Grouping rules
//!
//! | Head | Trigger | Members |
//! |---|---|---|
//! | interface | first `zone`/`tag` line of a name | every interface line of that name |
//! | service | first definition line of a name | definition lines of that name |
//! | group service | declaration without `add` | lines of the same group |
//! | group address | declaration without `add` | lines of the same group and zone |
//! | policy | any line with a non-zero id | contiguous run through the next `exit` |
//! | dip group | declaration without `member` | lines of the same group id |
//!
//! Every other command passes through on its own. Commands already marked
//! [`ProcessingState::Aggregated`] pass through unchanged, so running the
//! pass over its own output is a no-op.

use log::{debug, warn};

use crate::command::{Command, CommandKind, InterfaceType, ProcessingState};

/// How a command takes part in aggregation.
enum Role {
    /// Opens a group.
    Head,
    /// Kept on its own.
    Standalone,
    /// Waits to be swept into a group; dropped if none claims it.
    Member,
}

fn role(cmd: &Command) -> Role {
    match &cmd.kind {
        CommandKind::Interface(i) if i.sub_type == InterfaceType::Zone => Role::Head,
        CommandKind::Interface(_) => Role::Member,
        CommandKind::Service(s) if s.policy_context => Role::Member,
        CommandKind::Service(_) => Role::Head,
        CommandKind::GroupService(g) if !g.member.is_empty() => Role::Member,
        CommandKind::GroupService(_) => Role::Head,
        CommandKind::GroupAddress(g) if !g.member.is_empty() => Role::Member,
        CommandKind::GroupAddress(_) => Role::Head,
        CommandKind::Policy(p) if p.id == 0 => Role::Standalone,
        CommandKind::Policy(_) => Role::Head,
        CommandKind::GroupNatDip(g) if g.member != 0 => Role::Member,
        CommandKind::GroupNatDip(_) => Role::Head,
        _ => Role::Standalone,
    }
}

/// True when `other` belongs to the same logical object as `head`.
fn same_object(head: &Command, other: &Command) -> bool {
    match (&head.kind, &other.kind) {
        (CommandKind::Interface(h), CommandKind::Interface(o)) => h.name == o.name,
        (CommandKind::Service(h), CommandKind::Service(o)) => {
            h.name == o.name && !o.policy_context
        }
        (CommandKind::GroupService(h), CommandKind::GroupService(o)) => h.group == o.group,
        (CommandKind::GroupAddress(h), CommandKind::GroupAddress(o)) => {
            h.group == o.group && h.zone == o.zone
        }
        (CommandKind::GroupNatDip(h), CommandKind::GroupNatDip(o)) => h.group_id == o.group_id,
        _ => false,
    }
}

/// Indices of the policy body starting at `start`: the contiguous run
/// through the next `exit`, inclusive.
fn policy_run(commands: &[Command], start: usize) -> Vec<usize> {
    let mut run = Vec::new();
    let mut idx = start;
    while idx < commands.len() && commands[idx].object_word() != "exit" {
        run.push(idx);
        idx += 1;
    }
    if idx < commands.len() {
        run.push(idx);
    } else {
        warn!(
            "policy on line {} has no closing exit; body runs to end of file",
            commands[start].id
        );
    }
    run
}

/// Group scattered lines under their head commands.
///
/// Returns heads and standalone commands in original order. A head is
/// dropped only when it and all of its children are skipped; unclaimed
/// member lines are dropped.
pub fn aggregate(commands: Vec<Command>) -> Vec<Command> {
    let total = commands.len();
    let mut treated = vec![false; total];
    let mut plan: Vec<(usize, Vec<usize>)> = Vec::new();

    for idx in 0..total {
        if treated[idx] {
            continue;
        }
        let cmd = &commands[idx];
        if cmd.is_aggregated() {
            treated[idx] = true;
            plan.push((idx, Vec::new()));
            continue;
        }

        let candidates: Vec<usize> = match role(cmd) {
            Role::Member => continue,
            Role::Standalone => Vec::new(),
            Role::Head => match &cmd.kind {
                CommandKind::Policy(_) => policy_run(&commands, idx),
                _ => (0..total)
                    .filter(|&j| same_object(cmd, &commands[j]))
                    .collect(),
            },
        };

        treated[idx] = true;
        let mut children = Vec::new();
        for j in candidates {
            if j != idx && !treated[j] {
                treated[j] = true;
                children.push(j);
            }
        }
        plan.push((idx, children));
    }

    let mut slots: Vec<Option<Command>> = commands.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(plan.len());
    for (head_idx, child_indices) in plan {
        let Some(mut head) = slots[head_idx].take() else {
            continue;
        };
        for j in child_indices {
            if let Some(mut child) = slots[j].take() {
                child.state = ProcessingState::Aggregated;
                head.children.push(child);
            }
        }
        head.state = ProcessingState::Aggregated;
        if head.skip && head.children.iter().all(|c| c.skip) {
            continue;
        }
        out.push(head);
    }

    debug!("aggregated {total} commands into {} entries", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;

    fn commands(text: &str) -> Vec<Command> {
        let mut c = Classifier::new();
        text.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| c.classify(i + 1, l))
            .collect()
    }

    #[test]
    fn interface_lines_gather_under_zone_line() {
        let cfg = r#"set interface "ethernet0/0" ip 1.1.1.1/24
set interface "ethernet0/0" zone "Untrust"
set interface "ethernet0/1" zone "Trust"
set interface "ethernet0/0" mip 1.1.1.5 host 10.0.0.5 netmask 255.255.255.255 vr "trust-vr"
"#;
        let out = aggregate(commands(cfg));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, 2);
        let child_ids: Vec<usize> = out[0].children.iter().map(|c| c.id).collect();
        assert_eq!(child_ids, vec![1, 4]);
        assert!(out[1].children.is_empty());
    }

    #[test]
    fn groups_keyed_by_zone() {
        let cfg = r#"set group address "Trust" "g"
set group address "Trust" "g" add "a"
set group address "DMZ" "g"
set group address "DMZ" "g" add "b"
"#;
        let out = aggregate(commands(cfg));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].children[0].id, 2);
        assert_eq!(out[1].children[0].id, 4);
    }

    #[test]
    fn policy_body_is_contiguous() {
        let cfg = r#"set policy id 1 from "Trust" to "Untrust" "Any" "Any" "ANY" permit
set policy id 1
set src-address "net2"
exit
set policy id 2 from "Trust" to "Untrust" "Any" "Any" "ANY" deny
set policy id 2
exit
"#;
        let out = aggregate(commands(cfg));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].children.len(), 3);
        assert_eq!(out[1].id, 5);
        assert_eq!(out[1].children.len(), 2);
    }

    #[test]
    fn policy_without_exit_runs_to_end() {
        let cfg = "set policy id 1 from \"Trust\" to \"Untrust\" \"Any\" \"Any\" \"ANY\" permit\nset policy id 1\n";
        let out = aggregate(commands(cfg));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].children.len(), 1);
    }

    #[test]
    fn skipped_standalone_lines_leave_processed_set() {
        let out = aggregate(commands("set hostname fw\nset clock timezone 1\nset ntp server 1.1.1.1\n"));
        assert_eq!(out.len(), 1);
        assert!(!out[0].known);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let cfg = r#"set service "app" protocol tcp src-port 0-65535 dst-port 81-81
set service "app" + udp src-port 0-65535 dst-port 81-81
set dip group 3
set dip group 3 member 4
"#;
        let once = aggregate(commands(cfg));
        let shape = |v: &[Command]| -> Vec<(usize, Vec<usize>)> {
            v.iter()
                .map(|c| (c.id, c.children.iter().map(|k| k.id).collect()))
                .collect()
        };
        let first = shape(&once);
        let twice = aggregate(once);
        assert_eq!(first, shape(&twice));
        assert_eq!(first, vec![(1, vec![2]), (3, vec![4])]);
    }
}
