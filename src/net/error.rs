//! 错误类型

use thiserror::Error;

use super::id::{NodeId, Speed};
use super::node::ConnectionRequirement;

/// 工厂无法生成节点
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    #[error("unknown device type `{device_type}`")]
    UnknownDeviceType { device_type: String },

    #[error("device type `{device_type}` is limited to {limit} node(s)")]
    LimitReached { device_type: String, limit: usize },
}

/// 构建拓扑层失败
///
/// 除 `LayerLimit` / `AsymmetricLink` 外都带有出错的南向节点与需求。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("node {node} is not part of the fabric")]
    UnknownNode { node: NodeId },

    #[error("node {name} ({node}) requires unknown device type `{device_type}`")]
    UnknownDeviceType {
        node: NodeId,
        name: String,
        device_type: String,
    },

    #[error(
        "freshly created {peer_type} {peer} refused connection from {name} ({node}) at {}",
        .requirement.speed
    )]
    ConnectionRefused {
        node: NodeId,
        name: String,
        peer: NodeId,
        peer_type: String,
        requirement: ConnectionRequirement,
    },

    #[error(
        "no {} with a free {} port available for {name} ({node}): {reason}",
        .requirement.device_type,
        .requirement.speed
    )]
    CapacityExhausted {
        node: NodeId,
        name: String,
        requirement: ConnectionRequirement,
        reason: String,
    },

    #[error("topology did not converge within {max_layers} upstream layer(s)")]
    LayerLimit { max_layers: usize },

    #[error("link {a} <-> {b} at {speed} is not recorded on both ends")]
    AsymmetricLink { a: NodeId, b: NodeId, speed: Speed },
}

impl BuildError {
    /// 出错的南向节点（如果有）
    pub fn node(&self) -> Option<NodeId> {
        match self {
            BuildError::UnknownNode { node }
            | BuildError::UnknownDeviceType { node, .. }
            | BuildError::ConnectionRefused { node, .. }
            | BuildError::CapacityExhausted { node, .. } => Some(*node),
            BuildError::LayerLimit { .. } | BuildError::AsymmetricLink { .. } => None,
        }
    }
}
