//! 拓扑构建模块
//!
//! 逐层匹配南向需求与北向设备，生成分层拓扑。

mod builder;
mod layer;
mod log;

pub use builder::{ReservePolicy, TopologyBuilder, TopologyOpts};
pub use layer::{Layer, Topology};
pub use log::{BuildEvent, BuildLog};
