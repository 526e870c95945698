//! 快/慢双类队列（带准入控制）
//!
//! 优先级标签为 1 的包进入 fast 子队列，其余（包括未打标签的尽力而为流量）
//! 进入 slow 子队列。两个子队列各自独立计容量，出队时 fast 严格优先，
//! 同类内保持 FIFO。

use std::collections::VecDeque;

use crate::net::Packet;

use super::{Headroom, PacketQueue, SubQueueState};

#[derive(Debug)]
pub struct TwoClassQueue {
    fast_max: u32,
    slow_max: u32,
    fast: VecDeque<Packet>,
    slow: VecDeque<Packet>,
}

impl TwoClassQueue {
    pub fn new(fast_max: u32, slow_max: u32) -> Self {
        Self {
            fast_max,
            slow_max,
            fast: VecDeque::new(),
            slow: VecDeque::new(),
        }
    }

    pub fn fast_len(&self) -> usize {
        self.fast.len()
    }

    pub fn slow_len(&self) -> usize {
        self.slow.len()
    }
}

impl PacketQueue for TwoClassQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        let (q, max) = if pkt.tags.is_high_priority() {
            (&mut self.fast, self.fast_max)
        } else {
            (&mut self.slow, self.slow_max)
        };
        if q.len() >= max as usize {
            return Err(pkt);
        }
        q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        self.fast.pop_front().or_else(|| self.slow.pop_front())
    }

    fn len(&self) -> usize {
        self.fast.len().saturating_add(self.slow.len())
    }

    fn headroom(&self) -> Option<Headroom> {
        Some(Headroom {
            fast: SubQueueState {
                current: self.fast.len() as u32,
                max: self.fast_max,
            },
            slow: SubQueueState {
                current: self.slow.len() as u32,
                max: self.slow_max,
            },
        })
    }
}
