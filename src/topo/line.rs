//! 链状拓扑：n0 - n1 - ... - n(k-1)，第 i 条链路使用子网 `10.1.<i+1>.0`。

use crate::net::{LinkOpts, NetWorld, NodeId, QueueConfig};
use crate::sim::SimTime;

use super::connect_p2p;

#[derive(Debug, Clone, Copy)]
pub struct LineOpts {
    pub nodes: usize,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub metric_us: u32,
    pub queue: QueueConfig,
}

impl Default for LineOpts {
    fn default() -> Self {
        Self {
            nodes: 3,
            latency: SimTime::from_micros(1_000),
            bandwidth_bps: 10_000_000,
            metric_us: 1_000,
            queue: QueueConfig::TwoClass {
                fast_pkts: 8,
                slow_pkts: 8,
            },
        }
    }
}

/// 两端为主机，中间为路由器
pub fn build_line(world: &mut NetWorld, opts: &LineOpts) -> Vec<NodeId> {
    assert!(
        (2..=255).contains(&opts.nodes),
        "line topology needs 2..=255 nodes"
    );
    let last = opts.nodes - 1;
    let nodes: Vec<NodeId> = (0..opts.nodes)
        .map(|i| {
            if i == 0 || i == last {
                world.net.add_host(format!("h{i}"))
            } else {
                world.net.add_router(format!("r{i}"))
            }
        })
        .collect();
    let link = LinkOpts {
        latency: opts.latency,
        bandwidth_bps: opts.bandwidth_bps,
        metric_us: opts.metric_us,
        queue: opts.queue,
    };
    for (i, pair) in nodes.windows(2).enumerate() {
        connect_p2p(&mut world.net, pair[0], pair[1], (i + 1) as u8, &link);
    }
    nodes
}
