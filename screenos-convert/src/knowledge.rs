//! Predefined-service knowledge base.
//!
//! Four tables describe what both sides already know about services:
//! ScreenOS predefined services and groups, ScreenOS groups that have a
//! target-side equivalent, and the target system's own predefined services
//! keyed by port. The tables are loaded once and passed read-only through
//! the converter.
//!
//! ## Port keys
//!
//! ScreenOS keys follow [`ServiceProtocol::port_key`](screenos_core::ServiceProtocol::port_key).
//! Target ICMP keys drop the code, so `ICMP_8_0` is looked up as `ICMP_8`.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// One ScreenOS predefined service and the port keys it covers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScreenosService {
    pub name: String,
    pub ports: Vec<String>,
}

/// One ScreenOS predefined service group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScreenosGroup {
    pub name: String,
    pub members: Vec<String>,
}

/// ScreenOS group name to target predefined group name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupMapping {
    pub screenos: String,
    pub target: String,
}

/// Target predefined service and its port key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetService {
    pub name: String,
    pub port: String,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgeFile {
    #[serde(default)]
    reserved: Vec<String>,
    #[serde(default)]
    screenos_service: Vec<ScreenosService>,
    #[serde(default)]
    screenos_group: Vec<ScreenosGroup>,
    #[serde(default)]
    group_map: Vec<GroupMapping>,
    #[serde(default)]
    target_service: Vec<TargetService>,
}

/// Errors returned when loading a knowledge file.
#[derive(Debug, Error)]
pub enum KnowledgeLoadError {
    #[error("failed to read knowledge file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse knowledge file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Immutable lookup tables shared by one or more conversion runs.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    services: Vec<ScreenosService>,
    groups: Vec<ScreenosGroup>,
    group_map: Vec<GroupMapping>,
    target_services: Vec<TargetService>,
    reserved: BTreeSet<String>,
    target_by_port: HashMap<String, String>,
}

impl KnowledgeBase {
    fn from_file(file: KnowledgeFile) -> Self {
        let mut target_by_port = HashMap::new();
        for svc in &file.target_service {
            target_by_port
                .entry(svc.port.clone())
                .or_insert_with(|| svc.name.clone());
        }
        let mut reserved: BTreeSet<String> = file.reserved.into_iter().collect();
        reserved.insert("any".to_string());
        Self {
            services: file.screenos_service,
            groups: file.screenos_group,
            group_map: file.group_map,
            target_services: file.target_service,
            reserved,
            target_by_port,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.target_services.is_empty()
    }

    pub fn screenos_services(&self) -> &[ScreenosService] {
        &self.services
    }

    pub fn group_mappings(&self) -> &[GroupMapping] {
        &self.group_map
    }

    pub fn target_services(&self) -> &[TargetService] {
        &self.target_services
    }

    /// Target names that must never be emitted as new objects.
    pub fn reserved_names(&self) -> impl Iterator<Item = &str> {
        self.reserved.iter().map(String::as_str)
    }

    /// Port keys of a ScreenOS predefined service; empty when unknown.
    pub fn service_ports(&self, name: &str) -> &[String] {
        self.services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.ports.as_slice())
            .unwrap_or(&[])
    }

    /// Members of a ScreenOS predefined group, if `name` is one.
    pub fn group_members(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.members.as_slice())
    }

    /// Target predefined service covering a ScreenOS port key.
    ///
    /// MS-RPC keys never match. ICMP keys only match with code 0 (or the
    /// `ICMP_any_any` wildcard) and are looked up by type alone.
    pub fn target_service_for(&self, port_key: &str) -> Option<&str> {
        if port_key.starts_with("MS-RPC_") {
            return None;
        }
        let key = match port_key.strip_prefix("ICMP_") {
            Some("any_any") => "ICMP_99".to_string(),
            Some(rest) => {
                let (icmp_type, code) = rest.split_once('_')?;
                if code.parse::<u32>().ok()? != 0 {
                    return None;
                }
                format!("ICMP_{icmp_type}")
            }
            None => port_key.to_string(),
        };
        self.target_by_port.get(&key).map(String::as_str)
    }
}

/// Load a knowledge base from a TOML file.
pub fn load_knowledge(path: &Path) -> Result<KnowledgeBase, KnowledgeLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| KnowledgeLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_knowledge(&raw, path.display().to_string())
}

/// Built-in knowledge base.
pub fn default_knowledge() -> KnowledgeBase {
    let embedded = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/knowledge/services.toml"
    ));
    match parse_knowledge(embedded, "embedded knowledge".to_string()) {
        Ok(kb) if !kb.is_empty() => kb,
        _ => KnowledgeBase::from_file(KnowledgeFile::default()),
    }
}

/// Parse knowledge tables from TOML text. `path` only labels errors.
pub fn parse_knowledge(raw: &str, path: String) -> Result<KnowledgeBase, KnowledgeLoadError> {
    let parsed: KnowledgeFile =
        toml::from_str(raw).map_err(|source| KnowledgeLoadError::Parse { path, source })?;
    Ok(KnowledgeBase::from_file(parsed))
}
