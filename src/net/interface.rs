//! 节点接口
//!
//! 每个接口有一个地址、一个 up 标志、一个转发开关，以及挂在其上的出队列。
//! 0 号接口为环回。

use std::net::Ipv4Addr;

use super::id::{IfIndex, LinkId, NodeId};
use crate::queue::{DropTailQueue, Headroom, PacketQueue, QueueInspector};

#[derive(Debug)]
pub struct Interface {
    pub index: IfIndex,
    pub addr: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub up: bool,
    pub forwarding: bool,
    /// 出方向链路（环回为 None）
    pub link: Option<LinkId>,
    pub queue: Box<dyn PacketQueue + Send>,
}

/// 一个节点的全部接口
#[derive(Debug)]
pub struct InterfaceList {
    node: NodeId,
    ifaces: Vec<Interface>,
}

impl InterfaceList {
    pub fn new(node: NodeId) -> Self {
        let lo = Interface {
            index: IfIndex::LOOPBACK,
            addr: Ipv4Addr::LOCALHOST,
            mask: Ipv4Addr::new(255, 0, 0, 0),
            up: true,
            forwarding: false,
            link: None,
            queue: Box::new(DropTailQueue::new(0)),
        };
        Self {
            node,
            ifaces: vec![lo],
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn push(
        &mut self,
        addr: Ipv4Addr,
        mask: Ipv4Addr,
        forwarding: bool,
        link: LinkId,
        queue: Box<dyn PacketQueue + Send>,
    ) -> IfIndex {
        let index = IfIndex(self.ifaces.len() as u32);
        self.ifaces.push(Interface {
            index,
            addr,
            mask,
            up: true,
            forwarding,
            link: Some(link),
            queue,
        });
        index
    }

    pub fn get(&self, i: IfIndex) -> Option<&Interface> {
        self.ifaces.get(i.0 as usize)
    }

    pub fn get_mut(&mut self, i: IfIndex) -> Option<&mut Interface> {
        self.ifaces.get_mut(i.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.ifaces.iter()
    }

    pub fn len(&self) -> usize {
        self.ifaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ifaces.is_empty()
    }

    /// 地址是否属于本节点（任一接口，含环回；接口 down 时地址仍属于本节点）
    pub fn owns(&self, addr: Ipv4Addr) -> bool {
        !addr.is_unspecified() && self.ifaces.iter().any(|i| i.addr == addr)
    }

    /// 第一个非环回接口的地址
    pub fn primary_address(&self) -> Option<Ipv4Addr> {
        self.ifaces
            .iter()
            .find(|i| i.index != IfIndex::LOOPBACK && !i.addr.is_unspecified())
            .map(|i| i.addr)
    }
}

impl QueueInspector for InterfaceList {
    fn headroom(&self, iface: IfIndex) -> Option<Headroom> {
        self.get(iface)?.queue.headroom()
    }
}
