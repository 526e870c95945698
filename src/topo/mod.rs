//! 拓扑构建
//!
//! 点到点链路一律使用 /24 子网 `10.1.<k>.0`：先连接的一端取 `.1`，另一端取 `.2`。

mod grid;
mod line;

pub use grid::{GRID_HIGH_RATE_BPS, GRID_LOW_RATE_BPS, Grid3x3Opts, build_grid3x3};
pub use line::{LineOpts, build_line};

use std::net::Ipv4Addr;

use crate::net::{LinkId, LinkOpts, Network, NodeId};

pub const P2P_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// 第 `k` 个点到点子网两端的地址
pub fn p2p_addresses(k: u8) -> (Ipv4Addr, Ipv4Addr) {
    (Ipv4Addr::new(10, 1, k, 1), Ipv4Addr::new(10, 1, k, 2))
}

/// 在子网 `k` 上连接 `a`、`b`
pub fn connect_p2p(
    net: &mut Network,
    a: NodeId,
    b: NodeId,
    k: u8,
    opts: &LinkOpts,
) -> (LinkId, LinkId) {
    let (addr_a, addr_b) = p2p_addresses(k);
    net.connect(a, b, addr_a, addr_b, P2P_MASK, opts)
}
