//! 数据包类型
//!
//! 数据包按目的地址逐跳路由，携带一组元数据标签（见 `tags`）。

use std::net::Ipv4Addr;

use super::tags::PacketTags;

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub tags: PacketTags,
    /// 已经过的链路数
    pub hops_taken: u32,
}

impl Packet {
    /// 创建不带标签的数据包（尽力而为流量）
    pub fn new(id: u64, flow_id: u64, size_bytes: u32, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        Self {
            id,
            flow_id,
            size_bytes,
            src,
            dst,
            tags: PacketTags::default(),
            hops_taken: 0,
        }
    }

    pub fn with_tags(mut self, tags: PacketTags) -> Self {
        self.tags = tags;
        self
    }

    /// 经过一条链路
    pub fn advance(mut self) -> Self {
        self.hops_taken = self.hops_taken.saturating_add(1);
        self
    }
}
