//! 3x3 网格拓扑
//!
//! ```text
//! n0 --- n1 --- n2
//! |      |      |
//! n3 --- n4 --- n5
//! |      |      |
//! n6 --- n7 --- n8
//! ```
//!
//! 12 条链路混合了高/低带宽与短/长时延，路由距离单独给出，
//! 使任意两点之间都有多条代价相近的路径。

use crate::net::{LinkOpts, NetWorld, NodeId, QueueConfig};
use crate::sim::{DEFAULT_FAST_QUEUE_PKTS, DEFAULT_SLOW_QUEUE_PKTS, SimTime};

use super::connect_p2p;

pub const GRID_HIGH_RATE_BPS: u64 = 10_000_000;
pub const GRID_LOW_RATE_BPS: u64 = 5_000_000;

#[derive(Debug, Clone, Copy)]
pub struct Grid3x3Opts {
    pub fast_queue_pkts: u32,
    pub slow_queue_pkts: u32,
}

impl Default for Grid3x3Opts {
    fn default() -> Self {
        Self {
            fast_queue_pkts: DEFAULT_FAST_QUEUE_PKTS,
            slow_queue_pkts: DEFAULT_SLOW_QUEUE_PKTS,
        }
    }
}

/// (a, b, 带宽, 时延 us, 距离 us, 子网号)
const GRID_LINKS: [(usize, usize, u64, u64, u32, u8); 12] = [
    (0, 1, GRID_HIGH_RATE_BPS, 5_000, 6_000, 1),
    (0, 3, GRID_LOW_RATE_BPS, 3_000, 6_000, 11),
    (1, 2, GRID_LOW_RATE_BPS, 3_000, 5_000, 2),
    (1, 4, GRID_HIGH_RATE_BPS, 3_000, 4_000, 12),
    (2, 5, GRID_HIGH_RATE_BPS, 3_000, 4_000, 13),
    (3, 4, GRID_LOW_RATE_BPS, 5_000, 7_000, 4),
    (3, 6, GRID_HIGH_RATE_BPS, 3_000, 4_000, 14),
    (4, 5, GRID_HIGH_RATE_BPS, 5_000, 6_000, 5),
    (4, 7, GRID_HIGH_RATE_BPS, 3_000, 4_000, 15),
    (5, 8, GRID_LOW_RATE_BPS, 5_000, 7_000, 16),
    (6, 7, GRID_LOW_RATE_BPS, 5_000, 7_000, 7),
    (7, 8, GRID_HIGH_RATE_BPS, 3_000, 4_000, 8),
];

/// 构建网格，返回 n0..n8
pub fn build_grid3x3(world: &mut NetWorld, opts: &Grid3x3Opts) -> Vec<NodeId> {
    let nodes: Vec<NodeId> = (0..9)
        .map(|i| world.net.add_router(format!("n{i}")))
        .collect();
    let queue = QueueConfig::TwoClass {
        fast_pkts: opts.fast_queue_pkts,
        slow_pkts: opts.slow_queue_pkts,
    };
    for (a, b, bps, delay_us, metric_us, k) in GRID_LINKS {
        let link = LinkOpts {
            latency: SimTime::from_micros(delay_us),
            bandwidth_bps: bps,
            metric_us,
            queue,
        };
        connect_p2p(&mut world.net, nodes[a], nodes[b], k, &link);
    }
    nodes
}
