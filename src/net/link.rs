//! 链路记录
//!
//! 一条双向链路在两端各保存一条 `Link`，两端互为 peer。

use serde::{Deserialize, Serialize};

use super::id::{NodeId, Speed};

/// 链路在某一端的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub peer: NodeId,
    /// 对端的架构类型（用于判断北向需求是否已被满足）
    pub peer_type: String,
    pub speed: Speed,
    /// 本端端口号，`assign_ports` 之前为 None
    pub port: Option<u32>,
}

impl Link {
    /// 创建尚未编号的链路记录
    pub fn new(peer: NodeId, peer_type: impl Into<String>, speed: Speed) -> Self {
        Self {
            peer,
            peer_type: peer_type.into(),
            speed,
            port: None,
        }
    }
}

/// 一条双向边（按两端的 `NodeId` 归一化，`a < b`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub speed: Speed,
    pub a_port: Option<u32>,
    pub b_port: Option<u32>,
}
