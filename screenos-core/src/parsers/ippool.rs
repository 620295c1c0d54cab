use crate::command::{Command, CommandKind, IpPool};
use crate::incident::Severity;
use crate::netutil;
use crate::tokenizer::unquote;

/// `set ippool <name> <first> <last>`.
pub fn parse(cmd: &mut Command) {
    cmd.known = true;
    let mut pool = IpPool::default();
    if super::base_parse(cmd) {
        pool.name = unquote(cmd.tokens.token_at(2)).to_string();
        pool.first = cmd.tokens.token_at(3).to_string();
        pool.last = cmd.tokens.token_at(4).to_string();
        if !netutil::is_valid_ipv4(&pool.first)
            || !netutil::is_valid_ipv4(&pool.last)
            || netutil::ip_to_number(&pool.last) < netutil::ip_to_number(&pool.first)
        {
            cmd.set_incident(Severity::ManualActionRequired, "Invalid IP or Range between IPs");
        }
    }
    cmd.kind = CommandKind::IpPool(pool);
}
