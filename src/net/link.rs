//! 链路类型
//!
//! 单向点到点链路：传播时延、带宽、路由距离（metric），以及是否正在串行发送。
//! 排队发生在发送端接口的队列上。

use super::id::{IfIndex, NodeId};
use crate::queue::{DropTailQueue, PacketQueue, TwoClassQueue};
use crate::sim::SimTime;

/// 出接口队列配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueConfig {
    TwoClass { fast_pkts: u32, slow_pkts: u32 },
    DropTail { pkts: u32 },
}

impl QueueConfig {
    pub fn build(&self) -> Box<dyn PacketQueue + Send> {
        match *self {
            QueueConfig::TwoClass {
                fast_pkts,
                slow_pkts,
            } => Box::new(TwoClassQueue::new(fast_pkts, slow_pkts)),
            QueueConfig::DropTail { pkts } => Box::new(DropTailQueue::new(pkts)),
        }
    }
}

/// 建立一条双向链路所需的参数（两个方向相同）
#[derive(Debug, Clone, Copy)]
pub struct LinkOpts {
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 路由距离（微秒）
    pub metric_us: u32,
    pub queue: QueueConfig,
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub from_if: IfIndex,
    pub to: NodeId,
    pub to_if: IfIndex,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub metric_us: u32,
    /// 正在串行发送一个 packet
    pub busy: bool,
}

impl Link {
    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128)
            + (self.bandwidth_bps as u128 - 1))
            / self.bandwidth_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}
