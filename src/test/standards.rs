use std::fs;

use super::{G25, G100, LEAF_SPINE_YAML, unique_temp_dir};
use crate::config::{SCHEMA_VERSION, Standards, StandardsError};
use crate::topo::TopologyOpts;

fn issues(raw: &str) -> Vec<String> {
    match Standards::from_yaml_str(raw) {
        Err(StandardsError::Invalid(issues)) => issues,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn leaf_spine_standards_parse() {
    let s = Standards::from_yaml_str(LEAF_SPINE_YAML).expect("parse");
    assert_eq!(s.schema_version, SCHEMA_VERSION);
    assert_eq!(s.meta.as_ref().and_then(|m| m.name.as_deref()), Some("Leaf/Spine"));
    assert_eq!(s.devices.len(), 3);

    let leaf = s.device("leaf").expect("leaf");
    assert_eq!(leaf.ports.len(), 2);
    assert_eq!(leaf.ports[0].speed, G25);
    assert_eq!(leaf.connections[0].device_type, "spine");
    assert_eq!(leaf.connections[0].speed, G100);
    assert_eq!(leaf.connections[0].count, 2);

    assert_eq!(s.nodes[0].arch_type, "server");
    assert_eq!(s.nodes[0].count, 6);
    assert_eq!(s.topology_opts(), TopologyOpts::default());
}

#[test]
fn counts_default_to_one() {
    let s = Standards::from_yaml_str(
        r#"
schema_version: 1
devices:
  - arch_type: server
    ports: [{ speed: 100, count: 1 }]
    connections: [{ device_type: spine, speed: 100 }]
  - arch_type: spine
    ports: [{ speed: 100, count: 8 }]
nodes:
  - arch_type: server
"#,
    )
    .expect("parse");
    assert_eq!(s.device("server").expect("server").connections[0].count, 1);
    assert_eq!(s.nodes[0].count, 1);
}

#[test]
fn defaults_become_topology_opts() {
    let raw = LEAF_SPINE_YAML.to_string()
        + "defaults:\n  reserve_ports: 1\n  max_layers: 4\n  tier_reserve:\n    spine: 2\n";
    let opts = Standards::from_yaml_str(&raw).expect("parse").topology_opts();
    assert_eq!(opts.max_layers, 4);
    assert_eq!(opts.reserve.for_type("leaf"), 1);
    assert_eq!(opts.reserve.for_type("spine"), 2);
}

#[test]
fn json_standards_are_accepted() {
    let dir = unique_temp_dir("standards-json");
    let path = dir.join("standards.json");
    fs::write(
        &path,
        r#"{
  "schema_version": 1,
  "devices": [
    { "arch_type": "server", "ports": [{ "speed": 25, "count": 1 }],
      "connections": [{ "device_type": "leaf", "speed": 25 }] },
    { "arch_type": "leaf", "ports": [{ "speed": 25, "count": 48 }] }
  ],
  "nodes": [{ "arch_type": "server", "count": 3 }]
}"#,
    )
    .expect("write standards");

    let s = Standards::from_path(&path).expect("load json");
    assert_eq!(s.devices.len(), 2);
    assert_eq!(s.nodes[0].count, 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = unique_temp_dir("standards-missing");
    let err = Standards::from_path(&dir.join("nope.yaml")).expect_err("missing");
    assert!(matches!(err, StandardsError::Io { .. }));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = Standards::from_yaml_str("schema_version: [").expect_err("malformed");
    assert!(matches!(err, StandardsError::Yaml(_)));
}

#[test]
fn validation_collects_every_issue() {
    let found = issues(
        r#"
schema_version: 2
devices:
  - arch_type: server
    ports: [{ speed: 25, count: 2 }]
    connections:
      - { device_type: leaf, speed: 100 }
      - { device_type: core, speed: 25 }
  - arch_type: leaf
    ports: [{ speed: 25, count: 0 }]
  - arch_type: leaf
    ports: []
nodes:
  - arch_type: rack
defaults:
  max_layers: 0
  tier_reserve: { ghost: 1 }
"#,
    );
    let expected = [
        "unsupported schema_version 2",
        "server: no 100G ports for its connection to `leaf`",
        "server: `leaf` advertises no 100G ports",
        "server: connection targets unknown device type `core`",
        "leaf: port tier 0x25G must have positive speed and count",
        "devices: duplicate arch_type `leaf`",
        "nodes: unknown arch_type `rack`",
        "defaults: max_layers must be at least 1",
        "defaults.tier_reserve: unknown arch_type `ghost`",
    ];
    for want in expected {
        assert!(
            found.iter().any(|issue| issue.starts_with(want)),
            "missing issue `{want}` in {found:#?}"
        );
    }
    assert_eq!(found.len(), expected.len());
}

#[test]
fn empty_sections_are_rejected() {
    let found = issues("schema_version: 1\ndevices: []\n");
    assert_eq!(
        found,
        vec![
            "devices: at least one device type is required".to_string(),
            "nodes: at least one bottom-layer node group is required".to_string(),
        ]
    );
}

#[test]
fn invalid_error_lists_issues_in_message() {
    let err = Standards::from_yaml_str(
        "schema_version: 1\ndevices: [{ arch_type: server, ports: [] }]\nnodes: [{ arch_type: server, count: 0 }]\n",
    )
    .expect_err("invalid");
    assert_eq!(
        err.to_string(),
        "standards failed validation:\n  - nodes: `server` count must be at least 1"
    );
}
