//! 接口状态变化事件（up/down、地址增删）

use std::net::Ipv4Addr;

use super::id::{IfIndex, NodeId};
use super::net_world::NetWorld;
use crate::routing::InterfaceChange;
use crate::sim::{Event, Simulator, World};

#[derive(Debug, Clone)]
pub struct InterfaceEvent {
    pub node: NodeId,
    pub iface: IfIndex,
    pub change: InterfaceChange,
    /// AddAddress 时的新地址与掩码
    pub address: Option<(Ipv4Addr, Ipv4Addr)>,
}

impl Event for InterfaceEvent {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let InterfaceEvent {
            node,
            iface,
            change,
            address,
        } = *self;
        NetWorld::from_world(world)
            .net
            .apply_interface_change(node, iface, change, address, sim.now());
    }
}
