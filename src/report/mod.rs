//! 布线报告
//!
//! 从构建好的拓扑生成布线表：每条跨层链路一行（南向一端 -> 北向一端），
//! 用 Tera 模板渲染成 Markdown，或直接输出 JSON。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::net::Fabric;
use crate::topo::Topology;

/// 内置的 Markdown 模板
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/cabling.md.tera");

const TEMPLATE_NAME: &str = "cabling.md";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub arch_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub index: usize,
    pub nodes: usize,
    pub types: Vec<TypeCount>,
}

/// 布线表的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CablingRow {
    /// 南向一端所在层
    pub layer: usize,
    pub src: String,
    pub src_type: String,
    /// 未编号时为 "-"
    pub src_port: String,
    pub dst: String,
    pub dst_type: String,
    pub dst_port: String,
    pub speed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CablingReport {
    pub title: String,
    pub layers: Vec<LayerSummary>,
    pub rows: Vec<CablingRow>,
}

fn port_label(port: Option<u32>) -> String {
    port.map_or_else(|| "-".to_string(), |p| p.to_string())
}

impl CablingReport {
    /// 只包含两端都在 `topology` 中的链路
    pub fn from_topology(title: impl Into<String>, fabric: &Fabric, topology: &Topology) -> Self {
        let layers = topology
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for &id in &layer.nodes {
                    *counts.entry(fabric.node(id).arch_type()).or_default() += 1;
                }
                LayerSummary {
                    index,
                    nodes: layer.len(),
                    types: counts
                        .into_iter()
                        .map(|(arch_type, count)| TypeCount {
                            arch_type: arch_type.to_string(),
                            count,
                        })
                        .collect(),
                }
            })
            .collect();

        let mut keyed = Vec::new();
        for edge in fabric.edges() {
            let (Some(la), Some(lb)) = (topology.layer_of(edge.a), topology.layer_of(edge.b))
            else {
                continue;
            };
            let ((src, src_port, layer), (dst, dst_port)) = if la <= lb {
                ((edge.a, edge.a_port, la), (edge.b, edge.b_port))
            } else {
                ((edge.b, edge.b_port, lb), (edge.a, edge.a_port))
            };
            let (s, d) = (fabric.node(src), fabric.node(dst));
            let row = CablingRow {
                layer,
                src: s.name().to_string(),
                src_type: s.arch_type().to_string(),
                src_port: port_label(src_port),
                dst: d.name().to_string(),
                dst_type: d.arch_type().to_string(),
                dst_port: port_label(dst_port),
                speed: edge.speed.0,
            };
            keyed.push(((layer, src, src_port, dst), row));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            title: title.into(),
            layers,
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        }
    }

    /// 用 `template`（Tera 语法）渲染；None 表示使用内置模板
    pub fn render_markdown(&self, template: Option<&str>) -> Result<String, ReportError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template.unwrap_or(DEFAULT_TEMPLATE))?;
        let ctx = Context::from_serialize(self)?;
        Ok(tera.render(TEMPLATE_NAME, &ctx)?)
    }

    pub fn render_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(
        &self,
        format: ReportFormat,
        template: Option<&str>,
    ) -> Result<String, ReportError> {
        match format {
            ReportFormat::Markdown => self.render_markdown(template),
            ReportFormat::Json => self.render_json(),
        }
    }
}
