//! DropTail（尾丢弃）队列
//!
//! 以包数计容量；满时直接丢弃新到达的 packet。

use std::collections::VecDeque;

use crate::net::Packet;

use super::PacketQueue;

#[derive(Debug)]
pub struct DropTailQueue {
    max_pkts: u32,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(max_pkts: u32) -> Self {
        Self {
            max_pkts,
            q: VecDeque::new(),
        }
    }

    pub fn capacity_pkts(&self) -> u32 {
        self.max_pkts
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        if self.q.len() >= self.max_pkts as usize {
            return Err(pkt);
        }
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        self.q.pop_front()
    }

    fn len(&self) -> usize {
        self.q.len()
    }
}
