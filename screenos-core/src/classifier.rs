//! Statement classification.
//!
//! Maps a line to its statement kind through its object word and runs the
//! matching parser from the registry in [`crate::parsers`].

use log::trace;

use crate::command::Command;
use crate::parsers;

/// Top-level keywords that are never converted.
const IRRELEVANT: &[&str] = &[
    "key",
    "clock",
    "vrouter",
    "auto-route-export",
    "protocol",
    "area",
    "alg",
    "auth-server",
    "auth",
    "admin",
    "flow",
    "hostname",
    "pki",
    "nsrp",
    "dns",
    "user",
    "ike",
    "crypto-policy",
    "ipsec",
    "vpn",
    "url",
    "syslog",
    "nsmgmt",
    "ssh",
    "snmp",
    "user-group",
    "scheduler",
    "console",
    "telnet",
    "snmpv3",
    "config",
];

/// Keywords kept without a dedicated parser; they appear inside policy bodies.
const RELEVANT: &[&str] = &["dst-address", "src-address", "vsys-id"];

/// Classifies lines and counts `vsys-id` statements across a file.
#[derive(Debug, Default)]
pub struct Classifier {
    vsys_count: usize,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `vsys-id` statements seen so far.
    pub fn vsys_count(&self) -> usize {
        self.vsys_count
    }

    /// Build and parse the command for one line.
    pub fn classify(&mut self, id: usize, text: &str) -> Command {
        let mut cmd = Command::new(id, text);
        let word = cmd.object_word();

        if IRRELEVANT.contains(&word.as_str()) {
            cmd.skip = true;
            parsers::base_parse(&mut cmd);
            return cmd;
        }

        if RELEVANT.contains(&word.as_str()) {
            if word == "vsys-id" {
                self.vsys_count += 1;
            }
            cmd.known = true;
            parsers::base_parse(&mut cmd);
            return cmd;
        }

        match parsers::parser_for(&word) {
            Some(parse) => parse(&mut cmd),
            None => {
                trace!("line {id}: no parser for object word {word:?}");
                parsers::base_parse(&mut cmd);
            }
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;

    #[test]
    fn denylisted_words_are_skipped() {
        let mut c = Classifier::new();
        let cmd = c.classify(1, r#"set hostname "fw01""#);
        assert!(cmd.skip);
        assert!(matches!(cmd.kind, CommandKind::Generic));
    }

    #[test]
    fn relevant_words_are_known() {
        let mut c = Classifier::new();
        let cmd = c.classify(3, r#"set src-address "web""#);
        assert!(cmd.known);
        assert!(!cmd.skip);
        c.classify(4, "set vsys-id 0");
        c.classify(5, "set vsys-id 1");
        assert_eq!(c.vsys_count(), 2);
    }

    #[test]
    fn unknown_words_stay_generic() {
        let mut c = Classifier::new();
        let cmd = c.classify(2, "set ntp server 1.1.1.1");
        assert!(!cmd.known);
        assert!(!cmd.skip);
        assert!(matches!(cmd.kind, CommandKind::Generic));
    }

    #[test]
    fn exit_and_non_set_lines() {
        let mut c = Classifier::new();
        let exit = c.classify(9, "exit");
        assert!(exit.known && !exit.skip);
        let unset = c.classify(10, "unset key protection enable");
        assert!(unset.skip);
        let other = c.classify(11, "ns-> get config");
        assert!(other.skip);
    }

    #[test]
    fn registered_kinds_dispatch() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(1, r#"set address "Trust" "a" 1.1.1.1 255.255.255.255"#).kind_name(),
            "address"
        );
        assert_eq!(c.classify(2, "set dip group 4").kind_name(), "dip group");
        assert_eq!(
            c.classify(3, r#"set group service "web" add "HTTP""#).kind_name(),
            "group service"
        );
    }
}
