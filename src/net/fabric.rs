//! 节点仓库
//!
//! `Fabric` 持有所有节点（按 `NodeId` 下标存放），负责建立/撤销双向链路、
//! 校验链路两端一致以及给端口编号。

use std::collections::HashMap;

use super::error::BuildError;
use super::id::{NodeId, Speed};
use super::link::{Edge, Link};
use super::node::Node;
use tracing::{debug, trace, warn};

/// 节点仓库
#[derive(Debug, Default)]
pub struct Fabric {
    nodes: Vec<Box<dyn Node>>,
}

impl Fabric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 添加节点，`make` 收到分配给新节点的 id
    pub fn add_node(&mut self, make: impl FnOnce(NodeId) -> Box<dyn Node>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = make(id);
        debug_assert_eq!(node.id(), id, "node must carry the id it was created with");
        self.nodes.push(node);
        id
    }

    /// 与 `add_node` 相同，但构造过程可能失败；失败时仓库不变
    pub fn try_add_node<E>(
        &mut self,
        make: impl FnOnce(NodeId) -> Result<Box<dyn Node>, E>,
    ) -> Result<NodeId, E> {
        let id = NodeId(self.nodes.len());
        let node = make(id)?;
        debug_assert_eq!(node.id(), id, "node must carry the id it was created with");
        self.nodes.push(node);
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id.0).map(|n| &**n)
    }

    /// 按 id 取节点
    ///
    /// # Panics
    ///
    /// id 不属于本仓库时 panic。
    pub fn node(&self, id: NodeId) -> &dyn Node {
        &*self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Box<dyn Node> {
        &mut self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Node> + '_ {
        self.nodes.iter().map(|n| &**n)
    }

    /// id >= `len` 的节点，按 id 逆序
    pub(crate) fn nodes_from(&self, len: usize) -> impl Iterator<Item = &dyn Node> + '_ {
        self.nodes.iter().skip(len).rev().map(|n| &**n)
    }

    /// 丢弃 id >= `len` 的节点（仅用于撤销一次失败的构建）
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    fn pair_mut(
        &mut self,
        a: NodeId,
        b: NodeId,
    ) -> Option<(&mut Box<dyn Node>, &mut Box<dyn Node>)> {
        if a == b || a.0 >= self.nodes.len() || b.0 >= self.nodes.len() {
            return None;
        }
        if a.0 < b.0 {
            let (lo, hi) = self.nodes.split_at_mut(b.0);
            Some((&mut lo[a.0], &mut hi[0]))
        } else {
            let (lo, hi) = self.nodes.split_at_mut(a.0);
            Some((&mut hi[0], &mut lo[b.0]))
        }
    }

    /// 在 `a` 与 `b` 之间建立一条速率为 `speed` 的双向链路。
    ///
    /// 先占用 `b`（南向一端，端口通常更紧张）再占用 `a`；第二步失败时撤销第一步。
    /// 成功时两端各少一个 `speed` 端口，失败时两端都不变。
    #[tracing::instrument(skip(self))]
    pub fn connect(&mut self, a: NodeId, b: NodeId, speed: Speed) -> bool {
        let Some((na, nb)) = self.pair_mut(a, b) else {
            warn!("拒绝连接：节点不存在或两端相同");
            return false;
        };
        let a_type = na.arch_type().to_string();
        let b_type = nb.arch_type().to_string();

        if !nb.attach(Link::new(a, a_type, speed)) {
            debug!(node = %nb.name(), "南向一端没有可用端口");
            return false;
        }
        if !na.attach(Link::new(b, b_type, speed)) {
            let undone = nb.detach(a, speed);
            debug_assert!(undone, "rollback must remove the link just attached");
            debug!(node = %na.name(), "北向一端没有可用端口，已回滚南向一端");
            return false;
        }

        trace!(a_name = %na.name(), b_name = %nb.name(), "双向链路已建立");
        true
    }

    /// 撤销一条由 `connect(a, b, speed)` 建立的链路
    pub fn disconnect(&mut self, a: NodeId, b: NodeId, speed: Speed) -> bool {
        let Some((na, nb)) = self.pair_mut(a, b) else {
            return false;
        };
        let from_a = na.detach(b, speed);
        let from_b = nb.detach(a, speed);
        from_a && from_b
    }

    /// 校验每条链路都在两端各记录了同样的次数，并且 peer 类型与实际一致
    pub fn verify_links(&self) -> Result<(), BuildError> {
        let mut counts: HashMap<(NodeId, NodeId, Speed), usize> = HashMap::new();
        for node in self.iter() {
            for link in node.links() {
                let asymmetric = BuildError::AsymmetricLink {
                    a: node.id(),
                    b: link.peer,
                    speed: link.speed,
                };
                match self.get(link.peer) {
                    Some(peer) if peer.arch_type() == link.peer_type => {}
                    _ => return Err(asymmetric),
                }
                *counts.entry((node.id(), link.peer, link.speed)).or_default() += 1;
            }
        }
        for (&(a, b, speed), &n) in &counts {
            if counts.get(&(b, a, speed)).copied().unwrap_or(0) != n {
                return Err(BuildError::AsymmetricLink { a, b, speed });
            }
        }
        Ok(())
    }

    /// 给每个节点的链路按记录顺序从 1 开始编号，返回编号的链路记录数。
    ///
    /// 端口号超出 `u32` 的链路保持未编号。
    pub fn assign_ports(&mut self) -> usize {
        let mut numbered = 0;
        for node in &mut self.nodes {
            for (port, link) in (1..=u32::MAX).zip(node.links_mut().iter_mut()) {
                link.port = Some(port);
                numbered += 1;
            }
        }
        numbered
    }

    /// 全部双向边（每条边一次，`a < b`）。
    ///
    /// 同一对节点之间的多条同速率链路按记录顺序两两配对，以取得两端端口号。
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for node in self.iter() {
            let a = node.id();
            let mut seen: HashMap<(NodeId, Speed), usize> = HashMap::new();
            for link in node.links() {
                let nth = seen.entry((link.peer, link.speed)).or_default();
                let k = *nth;
                *nth += 1;
                if a >= link.peer {
                    continue;
                }
                let b_port = self.get(link.peer).and_then(|peer| {
                    peer.links()
                        .iter()
                        .filter(|l| l.peer == a && l.speed == link.speed)
                        .nth(k)
                        .and_then(|l| l.port)
                });
                edges.push(Edge {
                    a,
                    b: link.peer,
                    speed: link.speed,
                    a_port: link.port,
                    b_port,
                });
            }
        }
        edges
    }
}
