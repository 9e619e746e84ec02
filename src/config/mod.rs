//! 布线标准配置
//!
//! 声明式描述设备类型（端口、北向需求）与最底层节点，加载后先做校验，
//! 再交给 `DeviceCatalog` 作为节点工厂使用。

mod catalog;
mod standards;

pub use catalog::DeviceCatalog;
pub use standards::{
    BuildDefaults, ConnectionSpec, DeviceSpec, NodeGroupSpec, PortSpec, SCHEMA_VERSION, Standards,
    StandardsError, StandardsMeta,
};
