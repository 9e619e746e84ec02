use super::{G25, G100};
use crate::net::{ConnectionRequirement, Device, Link, Node, NodeId, Speed};

fn leaf() -> Device {
    Device::new(NodeId(0), "leaf-1", "leaf")
        .with_ports(G25, 4)
        .with_ports(G100, 2)
        .with_requirement("spine", G100, 2)
        .with_requirement("mgmt", G25, 1)
}

#[test]
fn pending_requirements_exclude_backed_ones() {
    let mut node = leaf();
    assert_eq!(node.device_connections().len(), 3);

    assert!(node.attach(Link::new(NodeId(7), "spine", G100)));
    let pending = node.device_connections();
    assert_eq!(
        pending,
        vec![
            ConnectionRequirement::new("spine", G100),
            ConnectionRequirement::new("mgmt", G25),
        ]
    );

    // 速率不同的链路不能满足需求
    assert!(node.attach(Link::new(NodeId(8), "mgmt", G100)));
    assert_eq!(node.device_connections().len(), 2);
}

#[test]
fn each_link_backs_at_most_one_requirement() {
    let mut node = leaf();
    assert!(node.attach(Link::new(NodeId(7), "spine", G100)));
    assert!(node.attach(Link::new(NodeId(7), "spine", G100)));
    assert_eq!(
        node.device_connections(),
        vec![ConnectionRequirement::new("mgmt", G25)]
    );
    assert!(!node.attach(Link::new(NodeId(9), "spine", G100)));
}

#[test]
fn attach_and_detach_move_one_port() {
    let mut node = leaf();
    assert_eq!(node.available_ports(G100), 2);
    assert!(node.attach(Link::new(NodeId(3), "spine", G100)));
    assert_eq!(node.available_ports(G100), 1);
    assert_eq!(node.available_ports(G25), 4);

    assert!(node.detach(NodeId(3), G100));
    assert_eq!(node.available_ports(G100), 2);
    assert!(node.links().is_empty());
    assert!(!node.detach(NodeId(3), G100));
}

#[test]
fn attach_refuses_missing_tier_without_mutation() {
    let mut node = leaf();
    assert!(!node.attach(Link::new(NodeId(1), "spine", Speed(400))));
    assert!(node.links().is_empty());
}

#[test]
fn detach_removes_most_recent_matching_link() {
    let mut node = leaf();
    assert!(node.attach(Link::new(NodeId(5), "spine", G100)));
    assert!(node.attach(Link::new(NodeId(6), "mgmt", G25)));
    assert!(node.attach(Link::new(NodeId(5), "spine", G100)));
    node.links_mut()[0].port = Some(1);

    assert!(node.detach(NodeId(5), G100));
    let peers: Vec<_> = node.links().iter().map(|l| (l.peer, l.port)).collect();
    assert_eq!(peers, vec![(NodeId(5), Some(1)), (NodeId(6), None)]);
}

#[test]
fn reserve_ports_saturates_per_tier() {
    let mut node = leaf();
    node.reserve_ports(3);

    // 25G 档留出 1 个口给 mgmt 上行
    assert_eq!(node.reserved_ports(G25), 3);
    assert_eq!(node.available_ports(G25), 1);
    // 100G 档的 2 个口都要用于 spine 上行
    assert_eq!(node.reserved_ports(G100), 0);
    assert_eq!(node.available_ports(G100), 2);
}

#[test]
fn reserve_ports_never_exceeds_free_ports() {
    let mut node = Device::new(NodeId(1), "spine-1", "spine").with_ports(G100, 4);
    assert!(node.attach(Link::new(NodeId(2), "leaf", G100)));
    assert!(node.attach(Link::new(NodeId(3), "leaf", G100)));
    node.reserve_ports(5);

    assert_eq!(node.reserved_ports(G100), 2);
    assert_eq!(node.available_ports(G100), 0);
    assert!(node.detach(NodeId(3), G100));
    assert_eq!(node.available_ports(G100), 1);
    assert_eq!(node.total_ports(G100), 4);
}
