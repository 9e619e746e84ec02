use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::net::Speed;
use crate::topo::{ReservePolicy, TopologyOpts};

/// 当前支持的 `schema_version`
pub const SCHEMA_VERSION: u32 = 1;

fn one() -> usize {
    1
}

/// 布线标准文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standards {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<StandardsMeta>,
    pub devices: Vec<DeviceSpec>,
    /// 最底层节点（服务器、机柜 ……）
    #[serde(default)]
    pub nodes: Vec<NodeGroupSpec>,
    #[serde(default)]
    pub defaults: Option<BuildDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardsMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 一种设备类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub arch_type: String,
    #[serde(default)]
    pub model: Option<String>,
    pub ports: Vec<PortSpec>,
    /// 北向连接需求
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    /// 最多允许生成多少个该类型节点
    #[serde(default)]
    pub max_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PortSpec {
    pub speed: Speed,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub device_type: String,
    pub speed: Speed,
    #[serde(default = "one")]
    pub count: usize,
}

/// 最底层的一组同类节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroupSpec {
    pub arch_type: String,
    #[serde(default = "one")]
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildDefaults {
    #[serde(default)]
    pub reserve_ports: Option<usize>,
    #[serde(default)]
    pub max_layers: Option<usize>,
    /// 按架构类型覆盖预留端口数
    #[serde(default)]
    pub tier_reserve: BTreeMap<String, usize>,
}

#[derive(Debug, Error)]
pub enum StandardsError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("standards failed validation:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

impl Standards {
    /// 读取并校验标准文件；`.json` 按 JSON 解析，其余按 YAML 解析
    pub fn from_path(path: &Path) -> Result<Self, StandardsError> {
        let raw = fs::read_to_string(path).map_err(|source| StandardsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        debug!(path = %path.display(), is_json, "读取布线标准");
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, StandardsError> {
        let standards: Standards = serde_yaml::from_str(raw)?;
        standards.validate()?;
        Ok(standards)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, StandardsError> {
        let standards: Standards = serde_json::from_str(raw)?;
        standards.validate()?;
        Ok(standards)
    }

    pub fn device(&self, arch_type: &str) -> Option<&DeviceSpec> {
        self.devices.iter().find(|d| d.arch_type == arch_type)
    }

    /// 语义校验：收集全部问题后一起返回
    pub fn validate(&self) -> Result<(), StandardsError> {
        let mut issues = Vec::new();

        if self.schema_version != SCHEMA_VERSION {
            issues.push(format!(
                "unsupported schema_version {} (expected {SCHEMA_VERSION})",
                self.schema_version
            ));
        }
        if self.devices.is_empty() {
            issues.push("devices: at least one device type is required".to_string());
        }

        let mut seen = BTreeSet::new();
        for dev in &self.devices {
            if dev.arch_type.trim().is_empty() {
                issues.push("devices: arch_type must not be empty".to_string());
            } else if !seen.insert(dev.arch_type.as_str()) {
                issues.push(format!("devices: duplicate arch_type `{}`", dev.arch_type));
            }
            if dev.max_count == Some(0) {
                issues.push(format!("{}: max_count must be at least 1", dev.arch_type));
            }
            for port in &dev.ports {
                if port.speed.0 == 0 || port.count == 0 {
                    issues.push(format!(
                        "{}: port tier {}x{} must have positive speed and count",
                        dev.arch_type, port.count, port.speed
                    ));
                }
            }
            for conn in &dev.connections {
                self.validate_connection(dev, conn, &mut issues);
            }
        }

        if self.nodes.is_empty() {
            issues.push("nodes: at least one bottom-layer node group is required".to_string());
        }
        for group in &self.nodes {
            if self.device(&group.arch_type).is_none() {
                issues.push(format!("nodes: unknown arch_type `{}`", group.arch_type));
            }
            if group.count == 0 {
                issues.push(format!("nodes: `{}` count must be at least 1", group.arch_type));
            }
        }

        if let Some(defaults) = &self.defaults {
            if defaults.max_layers == Some(0) {
                issues.push("defaults: max_layers must be at least 1".to_string());
            }
            for arch_type in defaults.tier_reserve.keys() {
                if self.device(arch_type).is_none() {
                    issues.push(format!("defaults.tier_reserve: unknown arch_type `{arch_type}`"));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(StandardsError::Invalid(issues))
        }
    }

    fn validate_connection(
        &self,
        dev: &DeviceSpec,
        conn: &ConnectionSpec,
        issues: &mut Vec<String>,
    ) {
        if conn.speed.0 == 0 || conn.count == 0 {
            issues.push(format!(
                "{}: connection to `{}` must have positive speed and count",
                dev.arch_type, conn.device_type
            ));
            return;
        }
        if !dev.ports.iter().any(|p| p.speed == conn.speed) {
            issues.push(format!(
                "{}: no {} ports for its connection to `{}`",
                dev.arch_type, conn.speed, conn.device_type
            ));
        }
        match self.device(&conn.device_type) {
            None => issues.push(format!(
                "{}: connection targets unknown device type `{}`",
                dev.arch_type, conn.device_type
            )),
            Some(target) if !target.ports.iter().any(|p| p.speed == conn.speed) => {
                issues.push(format!(
                    "{}: `{}` advertises no {} ports",
                    dev.arch_type, conn.device_type, conn.speed
                ))
            }
            Some(_) => {}
        }
    }

    /// 由 `defaults` 得到构建选项；未给出的字段使用 `TopologyOpts::default()`
    pub fn topology_opts(&self) -> TopologyOpts {
        let mut opts = TopologyOpts::default();
        if let Some(defaults) = &self.defaults {
            opts.reserve = ReservePolicy {
                default: defaults.reserve_ports.unwrap_or(0),
                per_type: defaults.tier_reserve.clone(),
            };
            if let Some(max_layers) = defaults.max_layers {
                opts.max_layers = max_layers;
            }
        }
        opts
    }
}
