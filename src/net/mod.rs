//! 网络设备模块
//!
//! 此模块包含拓扑构建所依赖的设备抽象：节点、链路、节点工厂以及保存节点的仓库。

// 子模块声明
mod error;
mod fabric;
mod factory;
mod id;
mod link;
mod node;

// 重新导出公共接口
pub use error::{BuildError, FactoryError};
pub use fabric::Fabric;
pub use factory::NodeFactory;
pub use id::{NodeId, Speed};
pub use link::{Edge, Link};
pub use node::{ConnectionRequirement, Device, Node};
