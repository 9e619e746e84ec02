//! 逐层构建拓扑
//!
//! 给定一层南向节点（服务器、机柜、leaf ……），按每个节点声明的北向连接需求，
//! 贪心地把它们接到已有的北向节点上，找不到就让工厂新建一个。
//!
//! 匹配规则：
//! - 南向节点按输入顺序处理，每个节点的需求按声明顺序处理；
//! - 在本次新建的北向节点中按创建顺序找第一个类型相同且有余量的节点（first-fit）；
//! - 找到后尝试连接，连接失败不再继续找，直接新建；
//! - 南向节点在该速率上已无空闲端口时直接失败，不新建节点；
//! - 新建的节点先按策略预留端口，再连接，连接失败即为致命错误。
//!
//! 任何一条需求失败都会让整次调用失败，并撤销本次调用建立的所有链路与节点。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::layer::{Layer, Topology};
use super::log::{BuildEvent, BuildLog};
use crate::net::{
    BuildError, ConnectionRequirement, Fabric, FactoryError, NodeFactory, NodeId, Speed,
};

/// 端口预留策略：默认预留数，以及按架构类型覆盖
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservePolicy {
    #[serde(default)]
    pub default: usize,
    #[serde(default)]
    pub per_type: BTreeMap<String, usize>,
}

impl ReservePolicy {
    /// 所有类型都预留 `count` 个端口
    pub fn uniform(count: usize) -> Self {
        Self {
            default: count,
            per_type: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, arch_type: impl Into<String>, count: usize) -> Self {
        self.per_type.insert(arch_type.into(), count);
        self
    }

    pub fn for_type(&self, arch_type: &str) -> usize {
        self.per_type.get(arch_type).copied().unwrap_or(self.default)
    }
}

/// 整体拓扑构建选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyOpts {
    pub reserve: ReservePolicy,
    /// 最多构建多少个北向层（防止需求成环时无限构建）
    pub max_layers: usize,
}

impl Default for TopologyOpts {
    fn default() -> Self {
        Self {
            reserve: ReservePolicy::default(),
            max_layers: 8,
        }
    }
}

/// 本次构建建立的一条链路，用于失败时按逆序撤销
#[derive(Debug, Clone, Copy)]
struct Connection {
    upstream: NodeId,
    downstream: NodeId,
    speed: Speed,
}

/// 拓扑构建器
pub struct TopologyBuilder<F: NodeFactory> {
    fabric: Fabric,
    factory: F,
    /// 最底层（输入层）
    nodes: Vec<NodeId>,
    /// 已构建的北向层
    layers: Vec<Layer>,
    /// 结构化决策记录（None 表示不记录）
    pub log: Option<BuildLog>,
}

impl<F: NodeFactory> TopologyBuilder<F> {
    /// `nodes` 为最底层节点，必须都属于 `fabric`
    pub fn new(fabric: Fabric, nodes: Vec<NodeId>, factory: F) -> Self {
        Self {
            fabric,
            factory,
            nodes,
            layers: Vec::new(),
            log: None,
        }
    }

    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn bottom(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn into_fabric(self) -> Fabric {
        self.fabric
    }

    /// 已构建层中某一架构类型的全部节点
    pub fn built_of_type(&self, arch_type: &str) -> Vec<NodeId> {
        self.layers
            .iter()
            .flat_map(|l| l.of_type(&self.fabric, arch_type))
            .collect()
    }

    pub fn leafs(&self) -> Vec<NodeId> {
        self.built_of_type("leaf")
    }

    pub fn spines(&self) -> Vec<NodeId> {
        self.built_of_type("spine")
    }

    pub fn superspines(&self) -> Vec<NodeId> {
        self.built_of_type("superspine")
    }

    fn record(&mut self, ev: BuildEvent) {
        if let Some(log) = &mut self.log {
            log.push(ev);
        }
    }

    /// 以 `old_nodes` 为南向层构建一个新层，所有新建节点预留 `reserve_ports` 个端口
    pub fn create_layer(
        &mut self,
        old_nodes: &[NodeId],
        reserve_ports: usize,
    ) -> Result<Layer, BuildError> {
        self.create_layer_with(old_nodes, &ReservePolicy::uniform(reserve_ports))
    }

    /// 与 `create_layer` 相同，但预留数按新建节点的类型取自 `policy`
    #[tracing::instrument(skip(self, old_nodes, policy), fields(old_nodes = old_nodes.len()))]
    pub fn create_layer_with(
        &mut self,
        old_nodes: &[NodeId],
        policy: &ReservePolicy,
    ) -> Result<Layer, BuildError> {
        let fabric_len = self.fabric.len();
        let mut journal = Vec::new();
        match self.build_layer(old_nodes, policy, &mut journal) {
            Ok(nodes) => {
                let layer = Layer::new(nodes);
                info!(new_nodes = layer.len(), links = journal.len(), "🧱 新层构建完成");
                if !layer.is_empty() {
                    self.layers.push(layer.clone());
                }
                Ok(layer)
            }
            Err(err) => {
                self.rollback(journal, fabric_len);
                Err(err)
            }
        }
    }

    /// 从最底层开始反复构建北向层，直到某一层不再产生新节点。
    ///
    /// 整个调用是一个事务：任意一层失败都会撤销本次调用的全部修改。
    #[tracing::instrument(skip(self, opts), fields(bottom = self.nodes.len(), max_layers = opts.max_layers))]
    pub fn create_topology(&mut self, opts: &TopologyOpts) -> Result<Topology, BuildError> {
        let fabric_len = self.fabric.len();
        let mut journal = Vec::new();
        let built = match self.build_tiers(opts, &mut journal) {
            Ok(built) => built,
            Err(err) => {
                self.rollback(journal, fabric_len);
                return Err(err);
            }
        };

        info!(
            layers = built.len(),
            nodes = self.fabric.len() - fabric_len,
            links = journal.len(),
            "✅ 拓扑构建完成"
        );
        self.layers.extend(built.iter().cloned());

        let mut layers = Vec::with_capacity(built.len() + 1);
        layers.push(Layer::new(self.nodes.clone()));
        layers.extend(built);
        Ok(Topology::new(layers))
    }

    /// 给所有链路编号（见 `Fabric::assign_ports`）
    pub fn assign_ports(&mut self) -> usize {
        let numbered = self.fabric.assign_ports();
        debug!(numbered, "端口编号完成");
        numbered
    }

    fn build_tiers(
        &mut self,
        opts: &TopologyOpts,
        journal: &mut Vec<Connection>,
    ) -> Result<Vec<Layer>, BuildError> {
        let mut built: Vec<Layer> = Vec::new();
        let mut current = self.nodes.clone();
        loop {
            let next = self.build_layer(&current, &opts.reserve, journal)?;
            if next.is_empty() {
                return Ok(built);
            }
            if built.len() >= opts.max_layers {
                warn!(max_layers = opts.max_layers, "北向层数超过上限");
                return Err(BuildError::LayerLimit {
                    max_layers: opts.max_layers,
                });
            }
            debug!(tier = built.len() + 1, nodes = next.len(), "北向层完成");
            built.push(Layer::new(next.clone()));
            current = next;
        }
    }

    fn build_layer(
        &mut self,
        old_nodes: &[NodeId],
        policy: &ReservePolicy,
        journal: &mut Vec<Connection>,
    ) -> Result<Vec<NodeId>, BuildError> {
        let mut new_nodes: Vec<NodeId> = Vec::new();
        for &old in old_nodes {
            let (old_name, requirements) = {
                let node = self
                    .fabric
                    .get(old)
                    .ok_or(BuildError::UnknownNode { node: old })?;
                (node.name().to_string(), node.device_connections())
            };
            if requirements.is_empty() {
                trace!(node = %old_name, "没有北向需求");
                continue;
            }

            for req in requirements {
                debug!(
                    node = %old_name,
                    device_type = %req.device_type,
                    speed = %req.speed,
                    "需要连接到北向设备"
                );
                self.record(BuildEvent::Requirement {
                    node: old,
                    device_type: req.device_type.clone(),
                    speed: req.speed,
                });

                if self.fabric.node(old).available_ports(req.speed) == 0 {
                    warn!(node = %old_name, speed = %req.speed, "南向节点没有空闲端口");
                    return Err(BuildError::CapacityExhausted {
                        node: old,
                        name: old_name.clone(),
                        requirement: req.clone(),
                        reason: format!("{old_name} has no free {} port left", req.speed),
                    });
                }

                if self.connect_existing(old, &req, &new_nodes, journal) {
                    continue;
                }
                let created = self.connect_new(old, &old_name, &req, policy, journal)?;
                new_nodes.push(created);
            }
        }
        Ok(new_nodes)
    }

    /// 在 `candidates` 中 first-fit 匹配并连接；只尝试第一个满足条件的候选
    fn connect_existing(
        &mut self,
        old: NodeId,
        req: &ConnectionRequirement,
        candidates: &[NodeId],
        journal: &mut Vec<Connection>,
    ) -> bool {
        let mut matched = None;
        for &id in candidates {
            let node = self.fabric.node(id);
            let available = node.available_ports(req.speed);
            if node.arch_type() == req.device_type && available > 0 {
                matched = Some(id);
                break;
            }
            trace!(candidate = %node.name(), available, "跳过候选节点");
            let arch_type = node.arch_type().to_string();
            self.record(BuildEvent::CandidateSkipped {
                candidate: id,
                arch_type,
                available,
            });
        }

        let Some(candidate) = matched else {
            return false;
        };
        debug!(candidate = %self.fabric.node(candidate).name(), "找到已有节点");
        self.record(BuildEvent::MatchFound {
            node: old,
            candidate,
        });

        if self.fabric.connect(candidate, old, req.speed) {
            journal.push(Connection {
                upstream: candidate,
                downstream: old,
                speed: req.speed,
            });
            self.record(BuildEvent::Connected {
                node: old,
                upstream: candidate,
                speed: req.speed,
                created: false,
            });
            true
        } else {
            debug!(candidate = %self.fabric.node(candidate).name(), "连接失败，可能端口不足");
            self.record(BuildEvent::ConnectFailed {
                node: old,
                candidate,
            });
            false
        }
    }

    /// 新建一个 `req.device_type` 节点并连接
    fn connect_new(
        &mut self,
        old: NodeId,
        old_name: &str,
        req: &ConnectionRequirement,
        policy: &ReservePolicy,
        journal: &mut Vec<Connection>,
    ) -> Result<NodeId, BuildError> {
        let factory = &mut self.factory;
        let created = self
            .fabric
            .try_add_node(|id| factory.generate_node(id, &req.device_type))
            .map_err(|err| match err {
                FactoryError::UnknownDeviceType { device_type } => BuildError::UnknownDeviceType {
                    node: old,
                    name: old_name.to_string(),
                    device_type,
                },
                other @ FactoryError::LimitReached { .. } => BuildError::CapacityExhausted {
                    node: old,
                    name: old_name.to_string(),
                    requirement: req.clone(),
                    reason: other.to_string(),
                },
            })?;

        let (new_name, new_type) = {
            let node = self.fabric.node(created);
            (node.name().to_string(), node.arch_type().to_string())
        };
        info!(node = %new_name, arch_type = %new_type, "🆕 新建北向节点");
        self.record(BuildEvent::NodeCreated {
            node: created,
            arch_type: new_type.clone(),
        });

        let reserve = policy.for_type(&new_type);
        if reserve > 0 {
            self.fabric.node_mut(created).reserve_ports(reserve);
            debug!(node = %new_name, reserve, "预留端口");
            self.record(BuildEvent::PortsReserved {
                node: created,
                count: reserve,
            });
            if self.fabric.node(created).available_ports(req.speed) == 0 {
                return Err(BuildError::CapacityExhausted {
                    node: old,
                    name: old_name.to_string(),
                    requirement: req.clone(),
                    reason: format!(
                        "reserving {reserve} port(s) leaves {new_name} no {} port",
                        req.speed
                    ),
                });
            }
        }

        if !self.fabric.connect(created, old, req.speed) {
            warn!(node = %old_name, upstream = %new_name, "新建节点拒绝连接");
            return Err(BuildError::ConnectionRefused {
                node: old,
                name: old_name.to_string(),
                peer: created,
                peer_type: new_type,
                requirement: req.clone(),
            });
        }
        journal.push(Connection {
            upstream: created,
            downstream: old,
            speed: req.speed,
        });
        self.record(BuildEvent::Connected {
            node: old,
            upstream: created,
            speed: req.speed,
            created: true,
        });
        Ok(created)
    }

    /// 按逆序撤销 `journal` 中的链路，并丢弃 id >= `fabric_len` 的节点
    fn rollback(&mut self, journal: Vec<Connection>, fabric_len: usize) {
        let links = journal.len();
        let nodes = self.fabric.len().saturating_sub(fabric_len);
        for conn in journal.into_iter().rev() {
            let undone = self
                .fabric
                .disconnect(conn.upstream, conn.downstream, conn.speed);
            debug_assert!(undone, "journaled link must exist on both ends");
        }
        for node in self.fabric.nodes_from(fabric_len) {
            self.factory.release(node);
        }
        self.fabric.truncate(fabric_len);
        warn!(links, nodes, "↩️  构建失败，已回滚");
        self.record(BuildEvent::RolledBack { links, nodes });
    }
}
