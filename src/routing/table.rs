//! 单节点路由表
//!
//! 表项按种类分桶（host / network / AS-external），桶内保持插入顺序以保证
//! 迭代确定。重建时整表替换，不做增量修补。

use std::net::Ipv4Addr;

use tracing::trace;

use super::entry::{RouteEntry, RouteKind};
use crate::net::IfIndex;

#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    host: Vec<RouteEntry>,
    network: Vec<RouteEntry>,
    external: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按种类追加到对应桶；不去重。
    pub fn add_route(&mut self, entry: RouteEntry) {
        trace!(dest = %entry.dest, gateway = %entry.gateway, iface = %entry.interface, distance = entry.distance, "添加路由");
        match entry.kind {
            RouteKind::Host => self.host.push(entry),
            RouteKind::Network => self.network.push(entry),
            RouteKind::AsExternal => self.external.push(entry),
        }
    }

    pub fn add_host_route_to(
        &mut self,
        dest: Ipv4Addr,
        next_hop: Ipv4Addr,
        interface: IfIndex,
        distance: u32,
    ) {
        self.add_route(RouteEntry::host_via(dest, next_hop, interface, distance));
    }

    pub fn add_network_route_to(
        &mut self,
        network: Ipv4Addr,
        mask: Ipv4Addr,
        next_hop: Option<Ipv4Addr>,
        interface: IfIndex,
    ) {
        self.add_route(RouteEntry::network(network, mask, next_hop, interface));
    }

    pub fn add_as_external_route_to(
        &mut self,
        network: Ipv4Addr,
        mask: Ipv4Addr,
        next_hop: Ipv4Addr,
        interface: IfIndex,
    ) {
        self.add_route(RouteEntry::as_external(network, mask, next_hop, interface));
    }

    /// 查找到 `dst` 的全部候选：有 host 路由时只返回 host 路由，
    /// 否则依次退到 network、AS-external。`oif` 限定出接口。
    pub fn lookup(&self, dst: Ipv4Addr, oif: Option<IfIndex>) -> Vec<&RouteEntry> {
        for bucket in [&self.host, &self.network, &self.external] {
            let found: Vec<&RouteEntry> = bucket
                .iter()
                .filter(|r| r.matches(dst))
                .filter(|r| oif.is_none_or(|i| r.interface == i))
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    pub fn n_routes(&self) -> usize {
        self.host.len() + self.network.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_routes() == 0
    }

    /// 全局序号：host 在前，network 次之，AS-external 最后。
    ///
    /// # Panics
    /// 序号越界。
    pub fn route(&self, index: usize) -> &RouteEntry {
        self.iter()
            .nth(index)
            .unwrap_or_else(|| panic!("route index {index} out of range ({} routes)", self.n_routes()))
    }

    /// # Panics
    /// 序号越界。
    pub fn remove_route(&mut self, index: usize) -> RouteEntry {
        let n = self.n_routes();
        let mut idx = index;
        for bucket in [&mut self.host, &mut self.network, &mut self.external] {
            if idx < bucket.len() {
                return bucket.remove(idx);
            }
            idx -= bucket.len();
        }
        panic!("route index {index} out of range ({n} routes)");
    }

    pub fn clear(&mut self) {
        self.host.clear();
        self.network.clear();
        self.external.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.host
            .iter()
            .chain(self.network.iter())
            .chain(self.external.iter())
    }
}
