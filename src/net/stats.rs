//! 统计信息
//!
//! 交付、按截止时间分类的交付、按原因分类的丢包，以及路由重建次数。

use serde::Serialize;

use crate::routing::RouteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    DeadlineExceeded,
    NoRoute,
    CongestionRejected,
    QueueFull,
    ForwardingDisabled,
    InterfaceDown,
}

impl From<&RouteError> for DropReason {
    fn from(e: &RouteError) -> Self {
        match e {
            RouteError::DeadlineExceeded { .. } => DropReason::DeadlineExceeded,
            RouteError::NoRoute { .. } | RouteError::NoFeasibleRoute { .. } => DropReason::NoRoute,
            RouteError::CongestionRejected { .. } => DropReason::CongestionRejected,
            RouteError::ForwardingDisabled { .. } => DropReason::ForwardingDisabled,
        }
    }
}

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub sent_pkts: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 带截止标签且按时送达
    pub deadline_met_pkts: u64,
    /// 带截止标签但迟到
    pub deadline_missed_pkts: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    pub dropped_deadline: u64,
    pub dropped_no_route: u64,
    pub dropped_congestion: u64,
    pub dropped_queue_full: u64,
    pub dropped_forwarding_disabled: u64,
    pub dropped_interface_down: u64,
    pub route_rebuilds: u64,
}

impl Stats {
    pub fn record_drop(&mut self, reason: DropReason, bytes: u32) {
        self.dropped_pkts += 1;
        self.dropped_bytes += bytes as u64;
        let slot = match reason {
            DropReason::DeadlineExceeded => &mut self.dropped_deadline,
            DropReason::NoRoute => &mut self.dropped_no_route,
            DropReason::CongestionRejected => &mut self.dropped_congestion,
            DropReason::QueueFull => &mut self.dropped_queue_full,
            DropReason::ForwardingDisabled => &mut self.dropped_forwarding_disabled,
            DropReason::InterfaceDown => &mut self.dropped_interface_down,
        };
        *slot += 1;
    }
}
