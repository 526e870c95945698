//! 仿真器
//!
//! 单线程、协作式的离散事件调度：同一时刻的事件严格按调度顺序（FIFO）执行，
//! 每个事件执行期间不会被打断，因此路由表重建对查找天然是原子的。

use super::event::{Event, World};
use super::time::SimTime;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 已调度事件：执行时间 + 单调递增序列号（同一时刻按序列号 FIFO）。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) seq: u64,
    pub(crate) ev: Box<dyn Event>,
}

// BinaryHeap 是 max-heap；需要最早时间、最小序列号先出队，因此反向比较。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

/// 事件驱动仿真器：维护当前虚拟时间与待执行事件。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 当前虚拟时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 调度事件在 `at` 执行；早于当前时间的请求按当前时间处理。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(
            now = ?self.now,
            at = ?at,
            seq,
            event_type = std::any::type_name::<E>(),
            "调度事件"
        );
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    fn step(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.now = item.at;
        debug!(now = ?self.now, seq = item.seq, remaining = self.q.len(), "执行事件");
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空或到达 `until`（含 `until` 时刻的事件）。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        info!(until = ?until, pending = self.q.len(), "▶️  开始运行仿真");
        let mut executed = 0u64;
        while self.q.peek().is_some_and(|top| top.at <= until) {
            let Some(item) = self.q.pop() else { break };
            self.step(item, world);
            executed += 1;
        }
        self.now = self.now.max(until);
        info!(executed, now = ?self.now, "⏸️  到达截止时间");
    }

    /// 运行所有事件直到队列为空。
    pub fn run(&mut self, world: &mut dyn World) {
        info!(pending = self.q.len(), "▶️  开始运行仿真");
        let mut executed = 0u64;
        while let Some(item) = self.q.pop() {
            self.step(item, world);
            executed += 1;
        }
        info!(executed, final_time = ?self.now, "✅ 仿真完成");
    }
}
