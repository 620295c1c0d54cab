//! Per-kind positional parsers.
//!
//! Every statement kind has a fixed token layout. Parsers read through the
//! clamped [`Tokens::token_at`](crate::tokenizer::Tokens::token_at) accessor,
//! so short input yields empty fields rather than errors. Problems are
//! reported through the command's `known`, `skip` and incident fields.

mod address;
mod group;
mod interface;
mod ippool;
mod nat;
mod policy;
mod route;
mod service;
mod zone;

use crate::command::Command;

pub use service::NEVER_TIMEOUT;
pub use zone::{GLOBAL_ZONE, PREDEFINED_ZONES, SPECIAL_ZONES, UNSUPPORTED_ZONES};

/// Parser entry point for one statement kind.
pub type ParseFn = fn(&mut Command);

/// Object word to parser registry.
const REGISTRY: &[(&str, ParseFn)] = &[
    ("address", address::parse),
    ("group address", group::parse_group_address),
    ("service", service::parse),
    ("group service", group::parse_group_service),
    ("ippool", ippool::parse),
    ("zone", zone::parse),
    ("interface", interface::parse),
    ("route", route::parse),
    ("policy", policy::parse),
    ("dip group", nat::parse_group_dip),
];

/// Look up the parser registered for an object word.
pub fn parser_for(object_word: &str) -> Option<ParseFn> {
    REGISTRY
        .iter()
        .find(|(word, _)| *word == object_word)
        .map(|(_, parse)| *parse)
}

/// Checks shared by every statement kind.
///
/// Returns false when the statement should not be parsed any further.
pub(crate) fn base_parse(cmd: &mut Command) -> bool {
    match cmd.tokens.token_at(0) {
        "exit" => {
            cmd.skip = false;
            cmd.known = true;
            true
        }
        "set" => true,
        _ => {
            cmd.skip = true;
            false
        }
    }
}
