//! 预算感知的多路径转发决策
//!
//! 两种模式：
//!
//! - **简单模式**：数据包没有完整的 flag/budget/timestamp 标签（或预算为 0）时，
//!   在候选路由中取距离最小者，不看队列。
//! - **预算模式**：只看 host 路由。先算剩余松弛量 `timestamp + budget - now`，再用上一跳写入的
//!   `distance` 标签封顶；只保留 `distance < 松弛量` 的候选，对每个候选做
//!   两跳准入预判（本地出队列 + 下游节点的出队列），在通过者中取距离最小者，
//!   最后原地改写 `distance` 与 `priority` 标签。
//!
//! 下游预判是同一时刻的同步查询：通过 `RoutingContext` 按节点号找到邻居的
//! `Forwarder` 与 `QueueInspector`，以无标签方式请邻居给出同一最终目的的路由。

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use super::entry::RouteEntry;
use super::table::RouteTable;
use crate::net::{IfIndex, NodeId, Packet, PacketTags, PRIORITY_HIGH, PRIORITY_LOW};
use crate::queue::QueueInspector;
use crate::sim::SimTime;

/// 选中路由的剩余松弛量需超过其距离这么多（微秒）才标为高优先级
pub const PRIORITY_GUARD_US: i64 = 10;

/// 选路失败的原因。对调用方一律表现为“无路由”。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route to {dst}")]
    NoRoute { dst: Ipv4Addr },
    #[error("deadline exceeded by {late_us}us")]
    DeadlineExceeded { late_us: i64 },
    #[error("no route to {dst} fits slack {slack_us}us")]
    NoFeasibleRoute { dst: Ipv4Addr, slack_us: i64 },
    #[error("all {candidates} feasible routes to {dst} are overloaded")]
    CongestionRejected { dst: Ipv4Addr, candidates: usize },
    #[error("forwarding disabled on interface {iif}")]
    ForwardingDisabled { iif: IfIndex },
}

impl RouteError {
    pub fn errno(&self) -> SocketErrno {
        SocketErrno::NoRouteToHost
    }
}

/// 交给分发层的错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketErrno {
    NotError,
    NoRouteToHost,
}

impl SocketErrno {
    pub fn of(res: &Result<RouteDecision, RouteError>) -> SocketErrno {
        match res {
            Ok(_) => SocketErrno::NotError,
            Err(e) => e.errno(),
        }
    }
}

/// 绑定到具体表项的路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub destination: Ipv4Addr,
    /// 出接口的本地地址
    pub source: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub interface: IfIndex,
    pub distance: u32,
}

/// 收包处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    LocalDeliver,
    Forward(RouteDecision),
    Drop(RouteError),
}

/// 节点的转发能力。
pub trait Forwarder {
    /// 为到 `dst` 的包选路；带齐截止标签时走预算模式并原地改写标签。
    fn decide(
        &self,
        dst: Ipv4Addr,
        oif: Option<IfIndex>,
        tags: &mut PacketTags,
        now: SimTime,
        ctx: &dyn RoutingContext,
    ) -> Option<RouteDecision>;
}

/// 决策时可见的全网视图，按节点号查找而不是按运行时类型。
pub trait RoutingContext {
    /// 出接口所连链路的对端节点及其入接口
    fn peer(&self, node: NodeId, iface: IfIndex) -> Option<(NodeId, IfIndex)>;
    fn forwarder(&self, node: NodeId) -> Option<&dyn Forwarder>;
    fn queues(&self, node: NodeId) -> Option<&dyn QueueInspector>;
    fn owns_address(&self, node: NodeId, addr: Ipv4Addr) -> bool;
    fn local_address(&self, node: NodeId, iface: IfIndex) -> Option<Ipv4Addr>;
    fn forwarding_enabled(&self, node: NodeId, iface: IfIndex) -> bool;
}

/// 单个节点上的预算感知路由实例
#[derive(Debug, Clone)]
pub struct DsrRouting {
    node: NodeId,
    table: RouteTable,
}

impl DsrRouting {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            table: RouteTable::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut RouteTable {
        &mut self.table
    }

    /// 整表替换，返回旧表
    pub fn replace_table(&mut self, table: RouteTable) -> RouteTable {
        std::mem::replace(&mut self.table, table)
    }

    /// 本地发出的包。非空且预算标签非零时走预算模式。
    #[tracing::instrument(skip(self, pkt, ctx), fields(node = ?self.node, pkt_id = pkt.id, dst = %pkt.dst))]
    pub fn route_output(
        &self,
        pkt: &mut Packet,
        oif: Option<IfIndex>,
        now: SimTime,
        ctx: &dyn RoutingContext,
    ) -> Result<RouteDecision, RouteError> {
        if pkt.size_bytes != 0 && pkt.tags.wants_budget_routing() {
            self.lookup_budgeted(pkt.dst, oif, &mut pkt.tags, now, ctx)
        } else {
            self.lookup_simple(pkt.dst, oif, ctx)
        }
    }

    /// 从 `iif` 收到的包：先判断是否本地交付，再判断该接口是否允许转发，最后选路。
    #[tracing::instrument(skip(self, pkt, ctx), fields(node = ?self.node, pkt_id = pkt.id, dst = %pkt.dst))]
    pub fn route_input(
        &self,
        pkt: &mut Packet,
        iif: IfIndex,
        now: SimTime,
        ctx: &dyn RoutingContext,
    ) -> InputAction {
        if ctx.owns_address(self.node, pkt.dst) {
            trace!("本地交付");
            return InputAction::LocalDeliver;
        }
        if !ctx.forwarding_enabled(self.node, iif) {
            debug!(iif = %iif, "接口未开启转发");
            return InputAction::Drop(RouteError::ForwardingDisabled { iif });
        }
        let res = if pkt.tags.wants_budget_routing() {
            self.lookup_budgeted(pkt.dst, None, &mut pkt.tags, now, ctx)
        } else {
            self.lookup_simple(pkt.dst, None, ctx)
        };
        match res {
            Ok(d) => InputAction::Forward(d),
            Err(e) => InputAction::Drop(e),
        }
    }

    /// 简单模式：候选中距离最小者，不看队列。
    pub fn lookup_simple(
        &self,
        dst: Ipv4Addr,
        oif: Option<IfIndex>,
        ctx: &dyn RoutingContext,
    ) -> Result<RouteDecision, RouteError> {
        let cands = self.table.lookup(dst, oif);
        let route = select_shortest(&cands).ok_or(RouteError::NoRoute { dst })?;
        trace!(candidates = cands.len(), distance = route.distance, iface = %route.interface, "简单模式选路");
        Ok(self.bind(route, ctx))
    }

    /// 预算模式
    pub fn lookup_budgeted(
        &self,
        dst: Ipv4Addr,
        oif: Option<IfIndex>,
        tags: &mut PacketTags,
        now: SimTime,
        ctx: &dyn RoutingContext,
    ) -> Result<RouteDecision, RouteError> {
        let Some(mut slack) = tags.slack_us(now.as_micros()) else {
            return self.lookup_simple(dst, oif, ctx);
        };
        if slack < 0 {
            debug!(late_us = -slack, "⏰ 超过截止时间，丢弃");
            return Err(RouteError::DeadlineExceeded { late_us: -slack });
        }
        // 上一跳承诺的距离是硬上限
        if let Some(dist) = tags.distance_us {
            slack = slack.min(dist as i64);
        }

        // 网段/外部路由没有距离，无法判断可行性，只用 host 路由
        let cands: Vec<&RouteEntry> = self
            .table
            .lookup(dst, oif)
            .into_iter()
            .filter(|r| r.is_host())
            .collect();
        if cands.is_empty() {
            return Err(RouteError::NoRoute { dst });
        }
        let feasible: Vec<&RouteEntry> = cands
            .into_iter()
            .filter(|r| (r.distance as i64) < slack)
            .collect();
        if feasible.is_empty() {
            debug!(slack_us = slack, "没有满足松弛量的路由");
            return Err(RouteError::NoFeasibleRoute {
                dst,
                slack_us: slack,
            });
        }

        let confirmed: Vec<&RouteEntry> = feasible
            .iter()
            .copied()
            .filter(|r| self.admits(r, dst, now, ctx))
            .collect();
        let Some(route) = select_shortest(&confirmed) else {
            debug!(candidates = feasible.len(), "候选路由全部过载");
            return Err(RouteError::CongestionRejected {
                dst,
                candidates: feasible.len(),
            });
        };

        tags.distance_us = Some(route.distance);
        let priority = if slack - route.distance as i64 > PRIORITY_GUARD_US {
            PRIORITY_HIGH
        } else {
            PRIORITY_LOW
        };
        tags.priority = Some(priority);
        debug!(
            slack_us = slack,
            distance = route.distance,
            priority,
            iface = %route.interface,
            confirmed = confirmed.len(),
            "预算模式选路"
        );
        Ok(self.bind(route, ctx))
    }

    /// 两跳准入预判：本地出队列有余量，且下游节点对同一目的的出队列也有余量。
    /// 下游不是目的地时，它的入接口必须开启转发。
    fn admits(
        &self,
        route: &RouteEntry,
        dst: Ipv4Addr,
        now: SimTime,
        ctx: &dyn RoutingContext,
    ) -> bool {
        let local = ctx
            .queues(self.node)
            .and_then(|q| q.headroom(route.interface));
        match local {
            Some(h) if !h.is_near_full() => {}
            Some(h) => {
                trace!(iface = %route.interface, ?h, "本地出队列接近满");
                return false;
            }
            None => {
                trace!(iface = %route.interface, "出接口没有双类队列，放弃该路由");
                return false;
            }
        }

        let Some((peer, peer_iif)) = ctx.peer(self.node, route.interface) else {
            return false;
        };
        if ctx.owns_address(peer, dst) {
            return true;
        }
        if !ctx.forwarding_enabled(peer, peer_iif) {
            trace!(peer = ?peer, iif = %peer_iif, "下游入接口不转发");
            return false;
        }
        let Some(fwd) = ctx.forwarder(peer) else {
            return false;
        };
        let mut bare = PacketTags::default();
        let Some(next) = fwd.decide(dst, None, &mut bare, now, ctx) else {
            trace!(peer = ?peer, "下游没有可用路由");
            return false;
        };
        match ctx.queues(peer).and_then(|q| q.headroom(next.interface)) {
            Some(h) if !h.is_near_full() => true,
            _ => {
                debug!(peer = ?peer, iface = %next.interface, "下游出队列接近满，判为过载");
                false
            }
        }
    }

    fn bind(&self, route: &RouteEntry, ctx: &dyn RoutingContext) -> RouteDecision {
        RouteDecision {
            destination: route.dest,
            source: ctx
                .local_address(self.node, route.interface)
                .unwrap_or(Ipv4Addr::UNSPECIFIED),
            gateway: route.gateway,
            interface: route.interface,
            distance: route.distance,
        }
    }
}

impl Forwarder for DsrRouting {
    fn decide(
        &self,
        dst: Ipv4Addr,
        oif: Option<IfIndex>,
        tags: &mut PacketTags,
        now: SimTime,
        ctx: &dyn RoutingContext,
    ) -> Option<RouteDecision> {
        let res = if tags.wants_budget_routing() {
            self.lookup_budgeted(dst, oif, tags, now, ctx)
        } else {
            self.lookup_simple(dst, oif, ctx)
        };
        res.ok()
    }
}

/// 距离严格最小者；并列时保留最早插入的表项。
pub fn select_shortest<'a>(cands: &[&'a RouteEntry]) -> Option<&'a RouteEntry> {
    cands.iter().copied().fold(None, |best, r| match best {
        Some(b) if b.distance <= r.distance => Some(b),
        _ => Some(r),
    })
}
