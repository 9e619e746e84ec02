mod node;
mod report;
mod standards;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::net::{Device, Fabric, FactoryError, Node, NodeFactory, NodeId, Speed};

pub(crate) const G25: Speed = Speed(25);
pub(crate) const G100: Speed = Speed(100);

/// 按类型保存端口表与北向需求的测试工厂
#[derive(Debug, Default)]
pub(crate) struct TemplateFactory {
    ports: BTreeMap<String, Vec<(Speed, usize)>>,
    requirements: BTreeMap<String, Vec<(String, Speed, usize)>>,
    pub created: usize,
}

impl TemplateFactory {
    pub(crate) fn with_device(mut self, arch_type: &str, ports: &[(Speed, usize)]) -> Self {
        self.ports.insert(arch_type.to_string(), ports.to_vec());
        self
    }

    pub(crate) fn with_requirement(
        mut self,
        arch_type: &str,
        device_type: &str,
        speed: Speed,
        count: usize,
    ) -> Self {
        self.requirements
            .entry(arch_type.to_string())
            .or_default()
            .push((device_type.to_string(), speed, count));
        self
    }
}

impl NodeFactory for TemplateFactory {
    fn generate_node(
        &mut self,
        id: NodeId,
        device_type: &str,
    ) -> Result<Box<dyn Node>, FactoryError> {
        let ports = self
            .ports
            .get(device_type)
            .ok_or_else(|| FactoryError::UnknownDeviceType {
                device_type: device_type.to_string(),
            })?;
        self.created += 1;
        let mut device = Device::new(id, format!("{device_type}-{}", self.created), device_type);
        for &(speed, count) in ports {
            device = device.with_ports(speed, count);
        }
        for (target, speed, count) in self.requirements.get(device_type).into_iter().flatten() {
            device = device.with_requirement(target.clone(), *speed, *count);
        }
        Ok(Box::new(device))
    }
}

/// 由闭包生成节点的工厂，用于注入异常节点
pub(crate) struct FnFactory<F>(pub F);

impl<F> NodeFactory for FnFactory<F>
where
    F: FnMut(NodeId, &str) -> Result<Box<dyn Node>, FactoryError>,
{
    fn generate_node(
        &mut self,
        id: NodeId,
        device_type: &str,
    ) -> Result<Box<dyn Node>, FactoryError> {
        (self.0)(id, device_type)
    }
}

/// 加入 `count` 个服务器，每个都需要 `per_node` 条到 `target` 的 `speed` 链路
pub(crate) fn add_servers(
    fabric: &mut Fabric,
    count: usize,
    target: &str,
    speed: Speed,
    per_node: usize,
) -> Vec<NodeId> {
    (0..count)
        .map(|i| {
            fabric.add_node(|id| {
                Box::new(
                    Device::new(id, format!("server-{i}"), "server")
                        .with_ports(speed, per_node)
                        .with_requirement(target, speed, per_node),
                )
            })
        })
        .collect()
}

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "netmodel-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// 三层叶脊布线标准（服务器 -> leaf -> spine）
pub(crate) const LEAF_SPINE_YAML: &str = r#"
schema_version: 1
meta:
  name: Leaf/Spine
devices:
  - arch_type: server
    ports:
      - { speed: 25, count: 2 }
    connections:
      - { device_type: leaf, speed: 25, count: 1 }
  - arch_type: leaf
    ports:
      - { speed: 25, count: 4 }
      - { speed: 100, count: 2 }
    connections:
      - { device_type: spine, speed: 100, count: 2 }
  - arch_type: spine
    ports:
      - { speed: 100, count: 4 }
nodes:
  - arch_type: server
    count: 6
"#;
