//! 层与拓扑

use serde::{Deserialize, Serialize};

use crate::net::{Fabric, NodeId};

/// 一层节点（按创建顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub nodes: Vec<NodeId>,
}

impl Layer {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// 本层中某一架构类型的节点
    pub fn of_type(&self, fabric: &Fabric, arch_type: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .copied()
            .filter(|&id| fabric.node(id).arch_type() == arch_type)
            .collect()
    }
}

/// 分层拓扑：`layers[0]` 是输入的最底层，之后每层都是上一层的北向层
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub layers: Vec<Layer>,
}

impl Topology {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn bottom(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// 构建出来的北向层（不含最底层）
    pub fn upstream(&self) -> &[Layer] {
        self.layers.get(1..).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// 节点所在层的下标
    pub fn layer_of(&self, id: NodeId) -> Option<usize> {
        self.layers.iter().position(|l| l.contains(id))
    }
}
