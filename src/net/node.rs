//! 节点类型
//!
//! 定义设备节点的能力约定（`Node` trait）以及按端口表建模的通用设备实现。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::id::{NodeId, Speed};
use super::link::Link;

/// 一条北向连接需求：需要连到一个 `device_type` 设备、速率为 `speed`。
///
/// 需要多条同类连接时重复声明。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionRequirement {
    pub device_type: String,
    pub speed: Speed,
}

impl ConnectionRequirement {
    pub fn new(device_type: impl Into<String>, speed: Speed) -> Self {
        Self {
            device_type: device_type.into(),
            speed,
        }
    }
}

/// 节点接口
///
/// 端口占用只能通过 `attach` / `detach` 改变；双向连接由 `Fabric::connect` 负责，
/// 它在两端各调用一次 `attach`，失败时用 `detach` 撤销。
pub trait Node: Send + std::fmt::Debug {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称（仅用于日志与报告）
    fn name(&self) -> &str;

    /// 架构类型，例如 "leaf"、"spine"，是匹配的键
    fn arch_type(&self) -> &str;

    /// 声明的全部北向连接需求（按声明顺序）
    fn declared_connections(&self) -> &[ConnectionRequirement];

    /// 指定速率下剩余的可用端口数（已扣除预留）
    fn available_ports(&self, speed: Speed) -> usize;

    fn links(&self) -> &[Link];

    /// 仅供端口编号使用
    fn links_mut(&mut self) -> &mut [Link];

    /// 记录链路的本端，占用一个 `link.speed` 端口；无可用端口时返回 false 且不做任何修改
    fn attach(&mut self, link: Link) -> bool;

    /// 移除最近一条到 `peer`、速率为 `speed` 的链路并归还端口
    fn detach(&mut self, peer: NodeId, speed: Speed) -> bool;

    /// 在每个速率档位上预留 `count` 个端口。
    ///
    /// 预留不超过该档位的空闲数，且不占用本节点尚未满足的北向需求所需的端口。
    fn reserve_ports(&mut self, count: usize);

    /// 尚未被已有链路满足的需求（按声明顺序）。
    ///
    /// 每条链路至多抵消一条类型与速率都相同的需求。
    fn device_connections(&self) -> Vec<ConnectionRequirement> {
        let links = self.links();
        let mut consumed = vec![false; links.len()];
        self.declared_connections()
            .iter()
            .filter(|req| {
                let hit = links.iter().zip(&consumed).position(|(l, used)| {
                    !*used && l.speed == req.speed && l.peer_type == req.device_type
                });
                match hit {
                    Some(i) => {
                        consumed[i] = true;
                        false
                    }
                    None => true,
                }
            })
            .cloned()
            .collect()
    }
}

/// 某一速率档位的端口使用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PortTier {
    total: usize,
    used: usize,
    reserved: usize,
}

impl PortTier {
    fn available(&self) -> usize {
        self.total.saturating_sub(self.used.saturating_add(self.reserved))
    }
}

/// 通用设备节点：按速率档位记录端口，按声明顺序记录北向需求
#[derive(Debug, Clone)]
pub struct Device {
    id: NodeId,
    name: String,
    arch_type: String,
    ports: BTreeMap<Speed, PortTier>,
    requirements: Vec<ConnectionRequirement>,
    links: Vec<Link>,
}

impl Device {
    /// 创建一个没有端口、没有需求的设备
    pub fn new(id: NodeId, name: impl Into<String>, arch_type: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            arch_type: arch_type.into(),
            ports: BTreeMap::new(),
            requirements: Vec::new(),
            links: Vec::new(),
        }
    }

    /// 增加 `count` 个 `speed` 端口
    pub fn with_ports(mut self, speed: Speed, count: usize) -> Self {
        let tier = self.ports.entry(speed).or_default();
        tier.total = tier.total.saturating_add(count);
        self
    }

    /// 追加 `count` 条到 `device_type` 的北向需求
    pub fn with_requirement(
        mut self,
        device_type: impl Into<String>,
        speed: Speed,
        count: usize,
    ) -> Self {
        let req = ConnectionRequirement::new(device_type, speed);
        self.requirements.extend(std::iter::repeat_n(req, count));
        self
    }

    /// 速率档位列表（升序）
    pub fn speeds(&self) -> impl Iterator<Item = Speed> + '_ {
        self.ports.keys().copied()
    }

    pub fn total_ports(&self, speed: Speed) -> usize {
        self.ports.get(&speed).map_or(0, |t| t.total)
    }

    pub fn reserved_ports(&self, speed: Speed) -> usize {
        self.ports.get(&speed).map_or(0, |t| t.reserved)
    }
}

impl Node for Device {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arch_type(&self) -> &str {
        &self.arch_type
    }

    fn declared_connections(&self) -> &[ConnectionRequirement] {
        &self.requirements
    }

    fn available_ports(&self, speed: Speed) -> usize {
        self.ports.get(&speed).map_or(0, PortTier::available)
    }

    fn links(&self) -> &[Link] {
        &self.links
    }

    fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    fn attach(&mut self, link: Link) -> bool {
        let Some(tier) = self.ports.get_mut(&link.speed) else {
            trace!(node = %self.name, speed = %link.speed, "没有该速率的端口");
            return false;
        };
        if tier.available() == 0 {
            trace!(node = %self.name, speed = %link.speed, "端口已用尽");
            return false;
        }
        tier.used += 1;
        self.links.push(link);
        true
    }

    fn detach(&mut self, peer: NodeId, speed: Speed) -> bool {
        let Some(idx) = self
            .links
            .iter()
            .rposition(|l| l.peer == peer && l.speed == speed)
        else {
            return false;
        };
        self.links.remove(idx);
        if let Some(tier) = self.ports.get_mut(&speed) {
            tier.used = tier.used.saturating_sub(1);
        }
        true
    }

    fn reserve_ports(&mut self, count: usize) {
        let pending = self.device_connections();
        for (speed, tier) in self.ports.iter_mut() {
            let own = pending.iter().filter(|r| r.speed == *speed).count();
            let extra = count.min(tier.available().saturating_sub(own));
            tier.reserved += extra;
        }
    }
}
