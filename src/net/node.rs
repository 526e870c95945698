//! 节点类型
//!
//! 主机与路由器只在 `kind()` 上不同；是否转发由建链时接口的转发开关决定
//! （主机接口关闭）。收包走同一条路径：交给本节点的路由实例判定
//! 本地交付、转发或丢弃。

use super::id::{IfIndex, NodeId};
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Host,
    Router,
}

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// 处理从 `iif` 到达的数据包
    fn on_packet(&mut self, pkt: Packet, iif: IfIndex, sim: &mut Simulator, net: &mut Network) {
        debug!(node_name = self.name(), kind = ?self.kind(), pkt_id = pkt.id, flow_id = pkt.flow_id, "处理数据包");
        net.receive(self.id(), pkt, iif, sim);
    }
}

/// 主机节点
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
}

impl Host {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Host
    }
}

/// 路由器节点
#[derive(Debug)]
pub struct Router {
    id: NodeId,
    name: String,
}

impl Router {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Router {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Router
    }
}
