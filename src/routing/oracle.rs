//! 全局路由计算
//!
//! 由拓扑快照一次性算出全网所有节点的多路径 host 路由。对每个目的节点在
//! 反向图上按链路 metric 做 Dijkstra，得到各节点到它的最短距离 `dist[*]`；
//! 然后对每个节点 `u` 的每条可用出链路 `u -> v`，只要 `dist[v] < dist[u]`
//! （严格更近，保证无环），就为目的节点的每个地址生成一条路由，
//! 距离为 `metric(u->v) + dist[v]`。入接口不转发的节点（主机）只能作为
//! 终点，不会出现在别人路径的中间。

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::net::Ipv4Addr;

use crate::net::{IfIndex, NodeId};

/// 节点接口快照
#[derive(Debug, Clone)]
pub struct IfaceSnapshot {
    pub index: IfIndex,
    pub addr: Ipv4Addr,
    pub up: bool,
    pub forwarding: bool,
}

#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub interfaces: Vec<IfaceSnapshot>,
}

/// 单向链路快照
#[derive(Debug, Clone)]
pub struct LinkSnapshot {
    pub from: NodeId,
    pub from_if: IfIndex,
    pub to: NodeId,
    pub to_if: IfIndex,
    pub metric: u32,
}

/// 由拓扑层在需要时生成、交给路由计算的只读快照
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

impl TopologySnapshot {
    fn iface(&self, node: NodeId, iface: IfIndex) -> Option<&IfaceSnapshot> {
        self.nodes
            .get(node.0)?
            .interfaces
            .iter()
            .find(|i| i.index == iface)
    }

    /// 两端接口都 up 且都有地址
    fn link_usable(&self, l: &LinkSnapshot) -> bool {
        let ok = |n, i| {
            self.iface(n, i)
                .is_some_and(|s| s.up && !s.addr.is_unspecified())
        };
        ok(l.from, l.from_if) && ok(l.to, l.to_if)
    }

    /// 从 `l` 进入 `l.to` 的包能否被继续转发
    fn transits(&self, l: &LinkSnapshot) -> bool {
        self.iface(l.to, l.to_if).is_some_and(|s| s.forwarding)
    }
}

/// 一条待安装的路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTuple {
    pub node: NodeId,
    pub dest: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub interface: IfIndex,
    pub distance: u32,
}

/// 全局拓扑路由计算
pub trait RouteOracle {
    fn compute(&self, topo: &TopologySnapshot) -> Vec<RouteTuple>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalRouteOracle;

impl RouteOracle for GlobalRouteOracle {
    fn compute(&self, topo: &TopologySnapshot) -> Vec<RouteTuple> {
        let n = topo.nodes.len();
        // adj[u] = 可用出链路；rev[v] = (u, metric, v 是否转发) 所有能一跳到达 v 的前驱
        let mut adj: Vec<Vec<&LinkSnapshot>> = vec![Vec::new(); n];
        let mut rev: Vec<Vec<(NodeId, u64, bool)>> = vec![Vec::new(); n];
        for l in topo.links.iter().filter(|l| topo.link_usable(l)) {
            if l.from.0 >= n || l.to.0 >= n {
                continue;
            }
            adj[l.from.0].push(l);
            rev[l.to.0].push((l.from, l.metric as u64, topo.transits(l)));
        }

        let mut out = Vec::new();
        let mut dist: Vec<u64> = vec![u64::MAX; n];
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();

        for dst in &topo.nodes {
            let addrs: Vec<Ipv4Addr> = dst
                .interfaces
                .iter()
                .filter(|i| i.up && i.index != IfIndex::LOOPBACK && !i.addr.is_unspecified())
                .map(|i| i.addr)
                .collect();
            if addrs.is_empty() {
                continue;
            }

            dist.fill(u64::MAX);
            heap.clear();
            dist[dst.id.0] = 0;
            heap.push(Reverse((0, dst.id.0)));
            while let Some(Reverse((d, v))) = heap.pop() {
                if d > dist[v] {
                    continue;
                }
                for &(pred, m, transit) in &rev[v] {
                    if v != dst.id.0 && !transit {
                        continue;
                    }
                    let nd = d.saturating_add(m);
                    if nd < dist[pred.0] {
                        dist[pred.0] = nd;
                        heap.push(Reverse((nd, pred.0)));
                    }
                }
            }

            for (u, links) in adj.iter().enumerate() {
                if u == dst.id.0 || dist[u] == u64::MAX {
                    continue;
                }
                for l in links {
                    let dv = dist[l.to.0];
                    if dv >= dist[u] || (l.to != dst.id && !topo.transits(l)) {
                        continue;
                    }
                    let Some(gw) = topo.iface(l.to, l.to_if).map(|i| i.addr) else {
                        continue;
                    };
                    let distance = u32::try_from(dv.saturating_add(l.metric as u64)).unwrap_or(u32::MAX);
                    for &a in &addrs {
                        out.push(RouteTuple {
                            node: NodeId(u),
                            dest: a,
                            next_hop: gw,
                            interface: l.from_if,
                            distance,
                        });
                    }
                }
            }
        }
        out
    }
}
