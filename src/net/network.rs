//! 网络拓扑管理
//!
//! 持有节点、接口（含出队列）、单向链路、每个节点的路由实例，负责：
//! 源端发包、收包判定、按路由结果入队、链路串行发送、接口事件与路由重建。

use std::net::Ipv4Addr;

use super::deliver_packet::DeliverPacket;
use super::id::{IfIndex, LinkId, NodeId};
use super::interface::InterfaceList;
use super::link::{Link, LinkOpts};
use super::link_ready::LinkReady;
use super::node::{Host, Node, NodeKind, Router};
use super::packet::Packet;
use super::stats::{DropReason, Stats};
use crate::queue::QueueInspector;
use crate::routing::{
    DsrRouting, Forwarder, GlobalRouteOracle, IfaceSnapshot, InputAction, InterfaceChange,
    LinkSnapshot, NodeSnapshot, RouteOracle, RoutingContext, TableMaintenance, TopologySnapshot,
    format_routing_table,
};
use crate::sim::{SimTime, Simulator};
use tracing::{debug, info, trace, warn};

/// 网络拓扑
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    kinds: Vec<NodeKind>,
    names: Vec<String>,
    ifaces: Vec<InterfaceList>,
    routing: Vec<DsrRouting>,
    links: Vec<Link>,
    oracle: Box<dyn RouteOracle + Send>,
    maintenance: TableMaintenance,
    next_pkt_id: u64,
    pub stats: Stats,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            kinds: Vec::new(),
            names: Vec::new(),
            ifaces: Vec::new(),
            routing: Vec::new(),
            links: Vec::new(),
            oracle: Box::new(GlobalRouteOracle),
            maintenance: TableMaintenance::default(),
            next_pkt_id: 0,
            stats: Stats::default(),
        }
    }
}

impl Network {
    fn add_node(&mut self, node: Box<dyn Node>) -> NodeId {
        let id = node.id();
        self.kinds.push(node.kind());
        self.names.push(node.name().to_string());
        self.nodes.push(Some(node));
        self.ifaces.push(InterfaceList::new(id));
        self.routing.push(DsrRouting::new(id));
        id
    }

    /// 添加主机节点（不转发）
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.add_node(Box::new(Host::new(id, name)))
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.add_node(Box::new(Router::new(id, name)))
    }

    /// 用一条双向点到点链路连接 `a`、`b`，两端各新增一个接口。
    ///
    /// 返回 (a->b, b->a) 两条单向链路。
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        addr_a: Ipv4Addr,
        addr_b: Ipv4Addr,
        mask: Ipv4Addr,
        opts: &LinkOpts,
    ) -> (LinkId, LinkId) {
        let ab = LinkId(self.links.len());
        let ba = LinkId(self.links.len() + 1);
        let fwd_a = self.kinds[a.0] == NodeKind::Router;
        let fwd_b = self.kinds[b.0] == NodeKind::Router;
        let if_a = self.ifaces[a.0].push(addr_a, mask, fwd_a, ab, opts.queue.build());
        let if_b = self.ifaces[b.0].push(addr_b, mask, fwd_b, ba, opts.queue.build());
        for (from, from_if, to, to_if) in [(a, if_a, b, if_b), (b, if_b, a, if_a)] {
            self.links.push(Link {
                from,
                from_if,
                to,
                to_if,
                latency: opts.latency,
                bandwidth_bps: opts.bandwidth_bps,
                metric_us: opts.metric_us,
                busy: false,
            });
        }
        debug!(a = ?a, b = ?b, %addr_a, %addr_b, metric_us = opts.metric_us, "建立链路");
        (ab, ba)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        &self.names[id.0]
    }

    pub fn node_kind(&self, id: NodeId) -> NodeKind {
        self.kinds[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn interfaces(&self, node: NodeId) -> &InterfaceList {
        &self.ifaces[node.0]
    }

    pub fn interfaces_mut(&mut self, node: NodeId) -> &mut InterfaceList {
        &mut self.ifaces[node.0]
    }

    pub fn routing(&self, node: NodeId) -> &DsrRouting {
        &self.routing[node.0]
    }

    pub fn routing_mut(&mut self, node: NodeId) -> &mut DsrRouting {
        &mut self.routing[node.0]
    }

    pub fn maintenance(&self) -> &TableMaintenance {
        &self.maintenance
    }

    pub fn maintenance_mut(&mut self) -> &mut TableMaintenance {
        &mut self.maintenance
    }

    pub fn set_oracle(&mut self, oracle: Box<dyn RouteOracle + Send>) {
        self.oracle = oracle;
    }

    pub fn address_of(&self, node: NodeId, iface: IfIndex) -> Option<Ipv4Addr> {
        self.ifaces.get(node.0)?.get(iface).map(|i| i.addr)
    }

    /// 创建不带标签的数据包
    pub fn make_packet(&mut self, flow_id: u64, size_bytes: u32, src: Ipv4Addr, dst: Ipv4Addr) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::new(id, flow_id, size_bytes, src, dst)
    }

    /// 当前拓扑的只读快照，交给全局路由计算
    pub fn topology_snapshot(&self) -> TopologySnapshot {
        let nodes = self
            .ifaces
            .iter()
            .map(|list| NodeSnapshot {
                id: list.node(),
                interfaces: list
                    .iter()
                    .map(|i| IfaceSnapshot {
                        index: i.index,
                        addr: i.addr,
                        up: i.up,
                        forwarding: i.forwarding,
                    })
                    .collect(),
            })
            .collect();
        let links = self
            .links
            .iter()
            .map(|l| LinkSnapshot {
                from: l.from,
                from_if: l.from_if,
                to: l.to,
                to_if: l.to_if,
                metric: l.metric_us,
            })
            .collect();
        TopologySnapshot { nodes, links }
    }

    /// 启动时装载全网路由
    pub fn initialize_routes(&mut self) {
        let topo = self.topology_snapshot();
        self.maintenance
            .initialize(&mut self.routing, &topo, &*self.oracle);
    }

    /// 修改接口状态，并按需重建全网路由。返回是否发生了重建。
    pub fn apply_interface_change(
        &mut self,
        node: NodeId,
        iface: IfIndex,
        change: InterfaceChange,
        address: Option<(Ipv4Addr, Ipv4Addr)>,
        now: SimTime,
    ) -> bool {
        let Some(ifc) = self.ifaces.get_mut(node.0).and_then(|l| l.get_mut(iface)) else {
            warn!(node = ?node, iface = %iface, "接口不存在，忽略接口事件");
            return false;
        };
        match change {
            InterfaceChange::Up => ifc.up = true,
            InterfaceChange::Down => ifc.up = false,
            InterfaceChange::AddAddress => {
                if let Some((addr, mask)) = address {
                    ifc.addr = addr;
                    ifc.mask = mask;
                }
            }
            InterfaceChange::RemoveAddress => ifc.addr = Ipv4Addr::UNSPECIFIED,
        }
        let topo = self.topology_snapshot();
        let rebuilt = self.maintenance.on_interface_change(
            node,
            iface,
            change,
            now,
            &mut self.routing,
            &topo,
            &*self.oracle,
        );
        if rebuilt {
            self.stats.route_rebuilds += 1;
        }
        rebuilt
    }

    /// 源端发包：本地选路后入队
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, flow_id = pkt.flow_id, dst = %pkt.dst))]
    pub fn send_from(&mut self, from: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        self.stats.sent_pkts += 1;
        let now = sim.now();
        let res = self.routing[from.0].route_output(&mut pkt, None, now, &*self);
        match res {
            Ok(decision) => {
                trace!(iface = %decision.interface, gateway = %decision.gateway, tags = %pkt.tags, "源端选路成功");
                self.transmit(from, decision.interface, pkt, sim);
            }
            Err(e) => {
                debug!(error = %e, "源端无可用路由，丢弃");
                self.stats.record_drop(DropReason::from(&e), pkt.size_bytes);
            }
        }
    }

    /// 将数据包交付给节点处理
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, iif: IfIndex, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let mut node = self.nodes[to.0].take().expect("node exists");
        node.on_packet(pkt, iif, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 节点收到包：本地交付、转发或丢弃
    pub fn receive(&mut self, at: NodeId, mut pkt: Packet, iif: IfIndex, sim: &mut Simulator) {
        let now = sim.now();
        let action = self.routing[at.0].route_input(&mut pkt, iif, now, &*self);
        match action {
            InputAction::LocalDeliver => self.on_delivered(at, pkt, now),
            InputAction::Forward(decision) => {
                trace!(iface = %decision.interface, tags = %pkt.tags, "转发");
                self.transmit(at, decision.interface, pkt, sim);
            }
            InputAction::Drop(e) => {
                debug!(node = ?at, pkt_id = pkt.id, error = %e, "转发失败，丢弃");
                self.stats.record_drop(DropReason::from(&e), pkt.size_bytes);
            }
        }
    }

    /// 把包放进 `node` 的 `iface` 出队列；链路空闲时立即开始发送。
    pub(crate) fn transmit(&mut self, node: NodeId, iface: IfIndex, pkt: Packet, sim: &mut Simulator) {
        let Some(ifc) = self.ifaces[node.0].get_mut(iface) else {
            self.stats.record_drop(DropReason::NoRoute, pkt.size_bytes);
            return;
        };
        let link_id = match ifc.link {
            Some(l) if ifc.up => l,
            _ => {
                debug!(node = ?node, iface = %iface, "出接口不可用，丢弃");
                self.stats
                    .record_drop(DropReason::InterfaceDown, pkt.size_bytes);
                return;
            }
        };
        if let Err(pkt) = ifc.queue.enqueue(pkt) {
            debug!(node = ?node, iface = %iface, pkt_id = pkt.id, "🗑️  出队列已满，丢弃");
            self.stats.record_drop(DropReason::QueueFull, pkt.size_bytes);
            return;
        }
        if !self.links[link_id.0].busy {
            self.start_tx(link_id, sim);
        }
    }

    fn start_tx(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let (from, from_if) = {
            let l = &self.links[link_id.0];
            (l.from, l.from_if)
        };
        let Some(pkt) = self.ifaces[from.0]
            .get_mut(from_if)
            .and_then(|i| i.queue.dequeue())
        else {
            return;
        };
        let link = &mut self.links[link_id.0];
        link.busy = true;
        let now = sim.now();
        let depart = now.saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        trace!(link_id = ?link_id, pkt_id = pkt.id, depart = ?depart, arrive = ?arrive, "开始发送");
        let (to, iif) = (link.to, link.to_if);
        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                iif,
                pkt: pkt.advance(),
            },
        );
    }

    /// 链路发送完一个包
    pub fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        self.links[link_id.0].busy = false;
        self.start_tx(link_id, sim);
    }

    /// 数据包送达目的地时的处理
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, now: SimTime) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        if let Some(deadline) = pkt.tags.deadline_us() {
            if now.as_micros() <= deadline {
                self.stats.deadline_met_pkts += 1;
            } else {
                self.stats.deadline_missed_pkts += 1;
            }
        }
        trace!(node = ?at, pkt_id = pkt.id, hops = pkt.hops_taken, "✅ 数据包送达目的地");
    }

    /// 全部节点的路由表文本
    pub fn format_routing_tables(&self, now: SimTime) -> String {
        let mut out = String::new();
        for r in &self.routing {
            out.push_str(&format_routing_table(r.node(), now, r.table(), |_| None));
        }
        out
    }

    /// 打印启动摘要
    pub fn log_summary(&self) {
        let routes: usize = self.routing.iter().map(|r| r.table().n_routes()).sum();
        info!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            routes,
            "🌐 网络就绪"
        );
    }
}

impl RoutingContext for Network {
    fn peer(&self, node: NodeId, iface: IfIndex) -> Option<(NodeId, IfIndex)> {
        let link = self.ifaces.get(node.0)?.get(iface)?.link?;
        self.links.get(link.0).map(|l| (l.to, l.to_if))
    }

    fn forwarder(&self, node: NodeId) -> Option<&dyn Forwarder> {
        self.routing.get(node.0).map(|r| r as &dyn Forwarder)
    }

    fn queues(&self, node: NodeId) -> Option<&dyn QueueInspector> {
        self.ifaces.get(node.0).map(|l| l as &dyn QueueInspector)
    }

    fn owns_address(&self, node: NodeId, addr: Ipv4Addr) -> bool {
        self.ifaces.get(node.0).is_some_and(|l| l.owns(addr))
    }

    fn local_address(&self, node: NodeId, iface: IfIndex) -> Option<Ipv4Addr> {
        self.address_of(node, iface)
    }

    fn forwarding_enabled(&self, node: NodeId, iface: IfIndex) -> bool {
        self.ifaces
            .get(node.0)
            .and_then(|l| l.get(iface))
            .is_some_and(|i| i.forwarding)
    }
}
