//! ScreenOS configuration parsing primitives used by the converter.
//!
//! The pipeline is tokenize → classify → parse → aggregate → resolve
//! topology. [`parse`] runs all of it over a whole configuration and returns
//! both the flat audit sequence and the aggregated sequence the converter
//! consumes.

pub mod aggregate;
pub mod classifier;
pub mod command;
pub mod error;
pub mod incident;
pub mod netutil;
pub mod parsers;
pub mod protocol;
pub mod tokenizer;
pub mod topology;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::Serialize;

pub use aggregate::aggregate;
pub use classifier::Classifier;
pub use command::{
    Address, AddressType, Command, CommandKind, GroupAddress, GroupNatDip, GroupService,
    Interface, InterfaceNat, InterfaceNatDip, InterfaceNatMip, InterfaceNatVip, InterfaceType,
    IpPool, Policy, PolicyAction, PolicyNatType, ProcessingState, Route, Service, Subnet,
    TimeoutUnit, VipData, Zone,
};
pub use error::ParseError;
pub use incident::{ConversionIncident, Severity};
pub use protocol::ServiceProtocol;
pub use tokenizer::Tokens;
pub use topology::ZoneMultiplicityIndex;

/// Per-kind statement counts of one parse run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseStats {
    pub lines: usize,
    pub statements: usize,
    pub known: usize,
    pub unknown: usize,
    pub skipped: usize,
    pub by_kind: BTreeMap<String, KindCounts>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct KindCounts {
    pub total: usize,
    pub skipped: usize,
}

impl ParseStats {
    fn collect(lines: usize, commands: &[Command]) -> Self {
        let mut stats = ParseStats {
            lines,
            statements: commands.len(),
            ..Self::default()
        };
        for cmd in commands {
            if cmd.skip {
                stats.skipped += 1;
            } else if cmd.known {
                stats.known += 1;
            } else {
                stats.unknown += 1;
            }
            let key = match cmd.kind_name() {
                "" => "generic",
                name => name,
            };
            let counts = stats.by_kind.entry(key.to_string()).or_default();
            counts.total += 1;
            if cmd.skip {
                counts.skipped += 1;
            }
        }
        stats
    }
}

/// Result of parsing one configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedConfig {
    /// Every non-blank line in file order.
    pub all: Vec<Command>,
    /// Aggregated heads and standalone commands consumed by the converter.
    pub processed: Vec<Command>,
    #[serde(skip)]
    pub multi_zone: ZoneMultiplicityIndex,
    pub stats: ParseStats,
}

impl ParsedConfig {
    /// True when `name` was declared under more than one zone.
    pub fn is_name_multi_zone(&self, name: &str) -> bool {
        self.multi_zone.is_multi_zone(name)
    }
}

/// Parse a whole configuration.
///
/// # Arguments
///
/// * `text` - Configuration text, one statement per line
///
/// # Returns
///
/// The parsed configuration, or [`ParseError::MultipleVsys`] when more than
/// one virtual system is configured.
pub fn parse(text: &str) -> Result<ParsedConfig, ParseError> {
    let mut classifier = Classifier::new();
    let mut all = Vec::new();
    let mut lines = 0;
    for (idx, line) in text.lines().enumerate() {
        lines += 1;
        if line.trim().is_empty() {
            continue;
        }
        all.push(classifier.classify(idx + 1, line));
    }

    if classifier.vsys_count() > 1 {
        return Err(ParseError::MultipleVsys {
            count: classifier.vsys_count(),
        });
    }

    let mut processed = aggregate(all.clone());
    topology::resolve_interfaces(&mut processed);
    let multi_zone = ZoneMultiplicityIndex::build(&processed);
    let stats = ParseStats::collect(lines, &all);
    debug!(
        "parsed {} statements ({} known, {} unknown, {} skipped)",
        stats.statements, stats.known, stats.unknown, stats.skipped
    );

    Ok(ParsedConfig {
        all,
        processed,
        multi_zone,
        stats,
    })
}

/// Parse a configuration file. Non-ASCII bytes are dropped.
pub fn parse_file(path: &Path) -> Result<ParsedConfig, ParseError> {
    let bytes = fs::read(path)?;
    let text: String = bytes
        .into_iter()
        .filter(u8::is_ascii)
        .map(char::from)
        .collect();
    parse(&text)
}
