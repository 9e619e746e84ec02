//! 节点工厂接口

use super::error::FactoryError;
use super::id::NodeId;
use super::node::Node;

/// 按设备类型生成新节点。
///
/// 生成的节点端口全空、没有链路，并且在它声明的每个速率上至少有一个空闲端口；
/// 不认识的类型必须返回错误，不能返回半初始化的节点。
pub trait NodeFactory {
    fn generate_node(
        &mut self,
        id: NodeId,
        device_type: &str,
    ) -> Result<Box<dyn Node>, FactoryError>;

    /// 撤销一次失败的构建时，对本次生成、即将被丢弃的每个节点调用（按生成的逆序）
    fn release(&mut self, _node: &dyn Node) {}
}

impl<F: NodeFactory + ?Sized> NodeFactory for &mut F {
    fn generate_node(
        &mut self,
        id: NodeId,
        device_type: &str,
    ) -> Result<Box<dyn Node>, FactoryError> {
        (**self).generate_node(id, device_type)
    }

    fn release(&mut self, node: &dyn Node) {
        (**self).release(node)
    }
}
