//! 构建过程记录
//!
//! 匹配过程中每个决策点都会产生一条结构化事件，开启记录后可以直接断言决策序列，
//! 也可以序列化成 JSON 离线查看。

use serde::{Deserialize, Serialize};

use crate::net::{NodeId, Speed};

/// 构建事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildEvent {
    /// 开始处理一个南向节点的一条需求
    Requirement {
        node: NodeId,
        device_type: String,
        speed: Speed,
    },
    /// 新层中的候选节点类型不符或没有余量
    CandidateSkipped {
        candidate: NodeId,
        arch_type: String,
        available: usize,
    },
    /// 首个满足类型与余量的候选
    MatchFound { node: NodeId, candidate: NodeId },
    /// 候选拒绝连接，转而新建节点
    ConnectFailed { node: NodeId, candidate: NodeId },
    NodeCreated { node: NodeId, arch_type: String },
    PortsReserved { node: NodeId, count: usize },
    Connected {
        node: NodeId,
        upstream: NodeId,
        speed: Speed,
        /// 新建节点为 true，复用已有节点为 false
        created: bool,
    },
    /// 构建失败，撤销本次调用建立的链路与节点
    RolledBack { links: usize, nodes: usize },
}

/// 一个简单的事件收集器（存内存）
#[derive(Debug, Default, Clone)]
pub struct BuildLog {
    pub events: Vec<BuildEvent>,
}

impl BuildLog {
    pub fn push(&mut self, ev: BuildEvent) {
        self.events.push(ev);
    }

    /// 事件类型名序列，便于断言决策顺序
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .iter()
            .map(|ev| match ev {
                BuildEvent::Requirement { .. } => "requirement",
                BuildEvent::CandidateSkipped { .. } => "candidate_skipped",
                BuildEvent::MatchFound { .. } => "match_found",
                BuildEvent::ConnectFailed { .. } => "connect_failed",
                BuildEvent::NodeCreated { .. } => "node_created",
                BuildEvent::PortsReserved { .. } => "ports_reserved",
                BuildEvent::Connected { .. } => "connected",
                BuildEvent::RolledBack { .. } => "rolled_back",
            })
            .collect()
    }
}
