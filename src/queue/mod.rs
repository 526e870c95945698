//! 队列策略（Queue disciplines）
//!
//! 每个出接口挂一个队列。`TwoClassQueue` 是带准入控制的快/慢双类队列，
//! 路由决策在提交前通过 `QueueInspector` 读取其占用情况；`DropTailQueue`
//! 是不参与准入预判的单类队列。

use crate::net::{IfIndex, Packet};

mod drop_tail;
mod two_class;

pub use drop_tail::DropTailQueue;
pub use two_class::TwoClassQueue;

/// 单个子队列的占用快照（以包计）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubQueueState {
    pub current: u32,
    pub max: u32,
}

impl SubQueueState {
    /// 距离满队列不足一个空位：`current >= max - 1`。
    ///
    /// 检查与入队之间留一个安全余量。
    pub fn is_near_full(&self) -> bool {
        self.current >= self.max.saturating_sub(1)
    }

    pub fn free(&self) -> u32 {
        self.max.saturating_sub(self.current)
    }
}

/// 双类队列的余量快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headroom {
    pub fast: SubQueueState,
    pub slow: SubQueueState,
}

impl Headroom {
    /// 任一子队列接近满即拒绝
    pub fn is_near_full(&self) -> bool {
        self.fast.is_near_full() || self.slow.is_near_full()
    }

    /// (fast 空位, slow 空位)
    pub fn free(&self) -> (u32, u32) {
        (self.fast.free(), self.slow.free())
    }
}

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 支持准入预判的队列返回快/慢子队列占用；其余返回 None
    fn headroom(&self) -> Option<Headroom> {
        None
    }
}

/// 按接口查询某节点出队列余量的能力。只读，不修改队列。
pub trait QueueInspector {
    /// 接口不存在或其队列不是双类队列时返回 None
    fn headroom(&self, iface: IfIndex) -> Option<Headroom>;
}
