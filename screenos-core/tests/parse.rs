use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use screenos_core::{
    parse, parse_file, AddressType, CommandKind, InterfaceNat, ParseError, PolicyNatType, Severity,
};
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join(path)
}

#[test]
fn parses_fixture_into_heads_and_audit_sequence() {
    let parsed = parse_file(&fixture("fixtures/ssg-basic.cfg")).expect("parse fixture");

    assert_eq!(parsed.all.len(), 105);
    assert_eq!(parsed.all[0].id, 1);
    assert!(parsed.all[0].skip);

    let interfaces: Vec<&str> = parsed
        .processed
        .iter()
        .filter_map(|c| c.as_interface())
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(
        interfaces,
        vec!["ethernet0/0", "ethernet0/1", "ethernet0/2", "ethernet0/3"]
    );

    let untrust = parsed
        .processed
        .iter()
        .find(|c| c.as_interface().is_some_and(|i| i.name == "ethernet0/0"))
        .expect("untrust interface");
    assert!(untrust.as_interface().expect("interface").leads_to_internet);
    let nat_children = untrust
        .children
        .iter()
        .filter(|c| c.as_interface().is_some_and(|i| i.nat.is_some()))
        .count();
    assert_eq!(nat_children, 4);
}

#[test]
fn multi_zone_names_are_detected() {
    let parsed = parse_file(&fixture("fixtures/ssg-basic.cfg")).expect("parse fixture");
    assert!(parsed.is_name_multi_zone("web-srv"));
    assert!(parsed.is_name_multi_zone("WEB-SRV"));
    assert!(!parsed.is_name_multi_zone("clients"));
}

#[test]
fn policy_bodies_are_aggregated() {
    let parsed = parse_file(&fixture("fixtures/ssg-basic.cfg")).expect("parse fixture");
    let policies: Vec<_> = parsed
        .processed
        .iter()
        .filter(|c| !c.skip)
        .filter_map(|c| c.as_policy().map(|p| (c, p)))
        .collect();

    let ids: Vec<u32> = policies.iter().map(|(_, p)| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 0]);

    let (mip_cmd, mip) = policies[1];
    assert_eq!(mip.nat_type, PolicyNatType::Mip);
    assert_eq!(mip.name, "dmz web");
    assert_eq!(mip_cmd.children.len(), 2);

    let (body, _) = policies[4];
    let words: Vec<String> = body.children.iter().map(|c| c.object_word()).collect();
    assert_eq!(words, vec!["policy", "src-address", "exit"]);

    assert!(policies[10].1.default_permit_all);
}

#[test]
fn address_scenarios() {
    let parsed = parse(
        "set address \"trust\" \"srv1\" 10.1.1.5 255.255.255.255\n\
         set address \"trust\" \"net1\" 10.1.1.0 255.255.255.0\n",
    )
    .expect("parse");
    let host = parsed.processed[0].as_address().expect("address");
    assert_eq!(host.address_type, AddressType::Host);
    assert_eq!(host.ip, "10.1.1.5");
    assert_eq!(host.name, "srv1");
    assert_eq!(host.zone, "trust");

    let net = parsed.processed[1].as_address().expect("address");
    assert_eq!(net.address_type, AddressType::Network);
    assert_eq!(net.ip, "10.1.1.0");
    assert_eq!(net.netmask, "255.255.255.0");
}

#[test]
fn multiple_vsys_is_fatal() {
    let err = parse("set vsys-id 0\nset address \"Trust\" \"a\" 1.1.1.1 255.255.255.255\nset vsys-id 1\n")
        .expect_err("multiple vsys");
    assert!(matches!(err, ParseError::MultipleVsys { count: 2 }));

    assert!(parse("set vsys-id 0\n").is_ok());
}

#[test]
fn non_ascii_bytes_are_dropped() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cfg.txt");
    fs::write(
        &path,
        b"set address \"Trust\" \"caf\xc3\xa9\" 10.0.0.1 255.255.255.255\n\n\nexit\n",
    )
    .expect("write");
    let parsed = parse_file(&path).expect("parse");
    assert_eq!(parsed.all.len(), 2);
    assert_eq!(parsed.all[1].id, 4);
    assert_eq!(parsed.processed[0].as_address().expect("address").name, "caf");
}

#[test]
fn parse_stats_count_by_kind() {
    let parsed = parse_file(&fixture("fixtures/ssg-basic.cfg")).expect("parse fixture");
    let stats = &parsed.stats;
    assert_eq!(stats.statements, stats.known + stats.unknown + stats.skipped);
    assert_eq!(stats.by_kind["address"].total, 6);
    assert_eq!(stats.by_kind["zone"].skipped, 3);
}

#[test]
fn interface_nat_incidents_surface_on_children() {
    let parsed = parse(
        "set interface \"ethernet0/0\" zone \"Untrust\"\n\
         set interface \"ethernet0/0\" vip 1.1.1.6 port-range 80 90\n",
    )
    .expect("parse");
    let child = &parsed.processed[0].children[0];
    assert_eq!(child.incident, Severity::ManualActionRequired);
    assert!(matches!(
        child.kind,
        CommandKind::Interface(ref i) if matches!(i.nat, Some(InterfaceNat::Vip(_)))
    ));
}

#[test]
fn parsed_config_serializes_without_tokens() {
    let parsed = parse("set address \"Trust\" \"pc\" 10.0.0.5 255.255.255.255\n").expect("parse");
    let json = serde_json::to_value(&parsed).expect("serialize");
    assert_eq!(json["all"][0]["id"], 1);
    assert!(json["all"][0].get("tokens").is_none());
    assert!(json.get("multi_zone").is_none());
    assert_eq!(json["stats"]["statements"], 1);
}
