//! 路由表项

use std::net::Ipv4Addr;

use crate::net::IfIndex;

pub const HOST_MASK: Ipv4Addr = Ipv4Addr::BROADCAST;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Host,
    Network,
    AsExternal,
}

/// 一条路由：目的、下一跳网关、出接口、到目的的距离（微秒）。
///
/// 网关为 `0.0.0.0` 表示目的直连。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub dest: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub interface: IfIndex,
    pub distance: u32,
    pub kind: RouteKind,
}

impl RouteEntry {
    pub fn host_via(dest: Ipv4Addr, gateway: Ipv4Addr, interface: IfIndex, distance: u32) -> Self {
        Self {
            dest,
            mask: HOST_MASK,
            gateway,
            interface,
            distance,
            kind: RouteKind::Host,
        }
    }

    pub fn host_direct(dest: Ipv4Addr, interface: IfIndex) -> Self {
        Self::host_via(dest, Ipv4Addr::UNSPECIFIED, interface, 0)
    }

    pub fn network(
        network: Ipv4Addr,
        mask: Ipv4Addr,
        gateway: Option<Ipv4Addr>,
        interface: IfIndex,
    ) -> Self {
        Self {
            dest: apply_mask(network, mask),
            mask,
            gateway: gateway.unwrap_or(Ipv4Addr::UNSPECIFIED),
            interface,
            distance: 0,
            kind: RouteKind::Network,
        }
    }

    pub fn as_external(
        network: Ipv4Addr,
        mask: Ipv4Addr,
        gateway: Ipv4Addr,
        interface: IfIndex,
    ) -> Self {
        Self {
            kind: RouteKind::AsExternal,
            ..Self::network(network, mask, Some(gateway), interface)
        }
    }

    pub fn is_host(&self) -> bool {
        self.kind == RouteKind::Host
    }

    pub fn is_gateway(&self) -> bool {
        !self.gateway.is_unspecified()
    }

    pub fn matches(&self, dst: Ipv4Addr) -> bool {
        match self.kind {
            RouteKind::Host => self.dest == dst,
            RouteKind::Network | RouteKind::AsExternal => apply_mask(dst, self.mask) == self.dest,
        }
    }
}

pub fn apply_mask(addr: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(addr.to_bits() & mask.to_bits())
}

/// 前缀长度 -> 点分掩码
pub fn prefix_mask(prefix_len: u8) -> Ipv4Addr {
    let len = prefix_len.min(32) as u32;
    let bits = if len == 0 { 0 } else { u32::MAX << (32 - len) };
    Ipv4Addr::from(bits)
}
