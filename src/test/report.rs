use super::LEAF_SPINE_YAML;
use crate::config::{DeviceCatalog, Standards};
use crate::net::Fabric;
use crate::report::{CablingReport, CablingRow, ReportFormat};
use crate::topo::{Topology, TopologyBuilder, TopologyOpts};

fn leaf_spine(number_ports: bool) -> (Fabric, Topology) {
    let standards = Standards::from_yaml_str(LEAF_SPINE_YAML).expect("standards");
    let mut catalog = DeviceCatalog::new(&standards);
    let mut fabric = Fabric::new();
    let servers = catalog.seed_bottom(&standards, &mut fabric).expect("seed");
    let mut builder = TopologyBuilder::new(fabric, servers, catalog);
    let topology = builder
        .create_topology(&TopologyOpts::default())
        .expect("topology");
    if number_ports {
        builder.assign_ports();
    }
    (builder.into_fabric(), topology)
}

fn row(
    layer: usize,
    src: &str,
    src_port: &str,
    dst: &str,
    dst_port: &str,
    speed: u32,
) -> CablingRow {
    let arch = |name: &str| name.rsplit_once('-').map_or(name, |(t, _)| t).to_string();
    CablingRow {
        layer,
        src: src.to_string(),
        src_type: arch(src),
        src_port: src_port.to_string(),
        dst: dst.to_string(),
        dst_type: arch(dst),
        dst_port: dst_port.to_string(),
        speed,
    }
}

#[test]
fn rows_run_from_lower_to_upper_layer() {
    let (fabric, topology) = leaf_spine(true);
    let report = CablingReport::from_topology("Leaf/Spine", &fabric, &topology);

    assert_eq!(report.rows.len(), 10);
    assert_eq!(report.rows[0], row(0, "server-001", "1", "leaf-001", "1", 25));
    assert_eq!(report.rows[4], row(0, "server-005", "1", "leaf-002", "1", 25));
    assert_eq!(
        &report.rows[6..],
        &[
            row(1, "leaf-001", "5", "spine-001", "1", 100),
            row(1, "leaf-001", "6", "spine-001", "2", 100),
            row(1, "leaf-002", "3", "spine-001", "3", 100),
            row(1, "leaf-002", "4", "spine-001", "4", 100),
        ]
    );

    let summary: Vec<_> = report
        .layers
        .iter()
        .map(|l| (l.index, l.nodes, l.types[0].arch_type.as_str(), l.types[0].count))
        .collect();
    assert_eq!(
        summary,
        vec![(0, 6, "server", 6), (1, 2, "leaf", 2), (2, 1, "spine", 1)]
    );
}

#[test]
fn unnumbered_ports_render_as_dash() {
    let (fabric, topology) = leaf_spine(false);
    let report = CablingReport::from_topology("draft", &fabric, &topology);
    assert!(report.rows.iter().all(|r| r.src_port == "-" && r.dst_port == "-"));
}

#[test]
fn markdown_uses_the_builtin_template() {
    let (fabric, topology) = leaf_spine(true);
    let md = CablingReport::from_topology("Leaf/Spine", &fabric, &topology)
        .render(ReportFormat::Markdown, None)
        .expect("render");

    assert!(md.starts_with("# Leaf/Spine\n"), "{md}");
    assert!(md.contains("| 1 | 2 | leaf x2 |"), "{md}");
    assert!(md.contains("| 0 | server-001 | 1 | leaf-001 | 1 | 25G |"), "{md}");
    assert!(md.contains("| 1 | leaf-002 | 4 | spine-001 | 4 | 100G |"), "{md}");
}

#[test]
fn custom_templates_see_the_report_fields() {
    let (fabric, topology) = leaf_spine(true);
    let report = CablingReport::from_topology("t", &fabric, &topology);
    let out = report
        .render_markdown(Some(
            "{% for row in rows %}{% if row.layer == 1 %}{{ row.src }}:{{ row.src_port }}>{{ row.dst }}:{{ row.dst_port }};{% endif %}{% endfor %}",
        ))
        .expect("render");
    assert_eq!(
        out,
        "leaf-001:5>spine-001:1;leaf-001:6>spine-001:2;leaf-002:3>spine-001:3;leaf-002:4>spine-001:4;"
    );
}

#[test]
fn broken_templates_are_reported() {
    let (fabric, topology) = leaf_spine(true);
    let report = CablingReport::from_topology("t", &fabric, &topology);
    assert!(report.render_markdown(Some("{% for row in rows %}")).is_err());
}

#[test]
fn json_report_round_trips() {
    let (fabric, topology) = leaf_spine(true);
    let report = CablingReport::from_topology("Leaf/Spine", &fabric, &topology);
    let raw = report.render(ReportFormat::Json, None).expect("render");
    let back: CablingReport = serde_json::from_str(&raw).expect("parse");
    assert_eq!(back, report);
}
