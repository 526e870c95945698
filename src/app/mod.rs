//! 流量注入与实验装配

mod experiment;

pub use experiment::{Installed, install_experiment};

use std::net::Ipv4Addr;

use crate::net::{NetWorld, NodeId, PacketTags};
use crate::sim::{Event, SimTime, Simulator, World};
use tracing::trace;

/// 源端给每个包打的截止标签参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineTagging {
    pub flag: bool,
    pub budget_us: u32,
}

/// 流量注入事件：恒定速率地从 `src` 发出数据包。
///
/// 每次执行发出一个包，然后在 `gap` 之后重新调度自己，直到包数用完或到达 `stop`。
#[derive(Debug, Clone)]
pub struct InjectFlow {
    pub flow_id: u64,
    pub src: NodeId,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub pkt_bytes: u32,
    pub remaining: u64,
    pub gap: SimTime,
    pub stop: SimTime,
    /// None 表示不带标签的尽力而为流量
    pub tagging: Option<DeadlineTagging>,
}

impl InjectFlow {
    /// 发送 `pkt_bytes` 字节在 `rate_mbps` 下的包间隔；速率非正时返回 None。
    pub fn gap_for_rate(pkt_bytes: u32, rate_mbps: f64) -> Option<SimTime> {
        if !rate_mbps.is_finite() || rate_mbps <= 0.0 {
            return None;
        }
        // bits / (Mbps * 1e6) 秒 = bits * 1000 / Mbps 纳秒
        let ns = pkt_bytes as f64 * 8_000.0 / rate_mbps;
        Some(SimTime((ns.ceil() as u64).max(1)))
    }
}

impl Event for InjectFlow {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let mut me = *self;
        let now = sim.now();
        if me.remaining == 0 || now >= me.stop {
            return;
        }
        let w = NetWorld::from_world(world);

        let mut pkt = w
            .net
            .make_packet(me.flow_id, me.pkt_bytes, me.src_addr, me.dst_addr);
        if let Some(t) = me.tagging {
            pkt = pkt.with_tags(PacketTags::deadline(t.flag, t.budget_us, now.as_micros()));
        }
        trace!(flow_id = me.flow_id, pkt_id = pkt.id, tags = %pkt.tags, "注入数据包");
        w.net.send_from(me.src, pkt, sim);

        me.remaining -= 1;
        if me.remaining > 0 {
            let next_at = now.saturating_add(me.gap);
            sim.schedule(next_at, me);
        }
    }
}
