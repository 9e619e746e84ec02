//! 按布线标准生成设备的节点工厂

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use super::standards::{DeviceSpec, Standards};
use crate::net::{Device, Fabric, FactoryError, Node, NodeFactory, NodeId};

/// 设备目录：以架构类型为键的设备模板，节点按类型依次命名为 `<arch_type>-001` ……
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, DeviceSpec>,
    generated: HashMap<String, usize>,
}

impl DeviceCatalog {
    /// `standards` 应已通过 `Standards::validate`
    pub fn new(standards: &Standards) -> Self {
        let devices = standards
            .devices
            .iter()
            .map(|d| (d.arch_type.clone(), d.clone()))
            .collect();
        Self {
            devices,
            generated: HashMap::new(),
        }
    }

    pub fn contains(&self, arch_type: &str) -> bool {
        self.devices.contains_key(arch_type)
    }

    /// 已生成的某类型节点数
    pub fn generated(&self, arch_type: &str) -> usize {
        self.generated.get(arch_type).copied().unwrap_or(0)
    }

    /// 生成一个设备；`name` 为 None 时使用自动编号的名字
    pub fn instantiate(
        &mut self,
        id: NodeId,
        arch_type: &str,
        name: Option<String>,
    ) -> Result<Device, FactoryError> {
        let spec = self
            .devices
            .get(arch_type)
            .ok_or_else(|| FactoryError::UnknownDeviceType {
                device_type: arch_type.to_string(),
            })?;
        let count = self.generated.entry(arch_type.to_string()).or_default();
        if let Some(limit) = spec.max_count {
            if *count >= limit {
                return Err(FactoryError::LimitReached {
                    device_type: arch_type.to_string(),
                    limit,
                });
            }
        }
        *count += 1;
        let name = name.unwrap_or_else(|| format!("{arch_type}-{:03}", *count));

        let mut device = Device::new(id, name, arch_type);
        for port in &spec.ports {
            device = device.with_ports(port.speed, port.count);
        }
        for conn in &spec.connections {
            device = device.with_requirement(conn.device_type.clone(), conn.speed, conn.count);
        }
        trace!(node = %device.name(), arch_type, "生成设备");
        Ok(device)
    }

    /// 按 `standards.nodes` 在 `fabric` 中生成最底层节点
    pub fn seed_bottom(
        &mut self,
        standards: &Standards,
        fabric: &mut Fabric,
    ) -> Result<Vec<NodeId>, FactoryError> {
        let mut bottom = Vec::new();
        for group in &standards.nodes {
            for _ in 0..group.count {
                let id = fabric.try_add_node(|id| {
                    self.instantiate(id, &group.arch_type, None)
                        .map(|d| Box::new(d) as Box<dyn Node>)
                })?;
                bottom.push(id);
            }
        }
        Ok(bottom)
    }
}

impl NodeFactory for DeviceCatalog {
    fn generate_node(
        &mut self,
        id: NodeId,
        device_type: &str,
    ) -> Result<Box<dyn Node>, FactoryError> {
        Ok(Box::new(self.instantiate(id, device_type, None)?))
    }

    /// 被撤销的节点不再计入 `max_count`，其自动编号也会被重新使用
    fn release(&mut self, node: &dyn Node) {
        if let Some(count) = self.generated.get_mut(node.arch_type()) {
            *count = count.saturating_sub(1);
        }
    }
}
