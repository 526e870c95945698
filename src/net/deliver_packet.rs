//! 数据包到达事件

use super::id::{IfIndex, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::debug;

/// 事件：packet 经链路传播后从 `iif` 到达节点 `to`。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub iif: IfIndex,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, iif, pkt } = *self;
        debug!(
            pkt_id = pkt.id,
            to = ?to,
            iif = %iif,
            hops_taken = pkt.hops_taken,
            now = ?sim.now(),
            "📨 数据包到达节点"
        );
        NetWorld::from_world(world).net.deliver(to, pkt, iif, sim);
    }
}
