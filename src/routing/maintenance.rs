//! 路由表维护
//!
//! 接口 up/down、地址增删都会触发全网重建：删除所有节点的全部路由，
//! 按新的拓扑快照重新计算，再整表装回。新表先完整建好再替换，
//! 查找永远看不到半旧半新的表。仿真时刻 0 的触发被忽略，避免把初始
//! 接口配置当作拓扑变化。

use tracing::{debug, info};

use super::decision::DsrRouting;
use super::oracle::{RouteOracle, TopologySnapshot};
use super::table::RouteTable;
use crate::net::{IfIndex, NodeId};
use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Stable,
    Rebuilding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceChange {
    Up,
    Down,
    AddAddress,
    RemoveAddress,
}

#[derive(Debug)]
pub struct TableMaintenance {
    state: TableState,
    respond_to_interface_events: bool,
    rebuilds: u64,
}

impl Default for TableMaintenance {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TableMaintenance {
    pub fn new(respond_to_interface_events: bool) -> Self {
        Self {
            state: TableState::Stable,
            respond_to_interface_events,
            rebuilds: 0,
        }
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn respond_to_interface_events(&self) -> bool {
        self.respond_to_interface_events
    }

    pub fn set_respond_to_interface_events(&mut self, on: bool) {
        self.respond_to_interface_events = on;
    }

    /// 启动时的首次装表，不计入重建次数
    pub fn initialize(
        &mut self,
        routing: &mut [DsrRouting],
        topo: &TopologySnapshot,
        oracle: &dyn RouteOracle,
    ) {
        self.install(routing, topo, oracle);
        info!(nodes = routing.len(), "🗺️  初始路由表已装载");
    }

    /// 接口事件。返回是否发生了重建。
    pub fn on_interface_change(
        &mut self,
        node: NodeId,
        iface: IfIndex,
        change: InterfaceChange,
        now: SimTime,
        routing: &mut [DsrRouting],
        topo: &TopologySnapshot,
        oracle: &dyn RouteOracle,
    ) -> bool {
        if !self.respond_to_interface_events || now == SimTime::ZERO {
            debug!(node = ?node, iface = %iface, ?change, now = ?now, "忽略接口事件");
            return false;
        }
        info!(node = ?node, iface = %iface, ?change, now = ?now, "🔁 接口事件，重建全网路由");
        self.rebuild(routing, topo, oracle);
        true
    }

    /// Stable -> Rebuilding -> Stable
    pub fn rebuild(
        &mut self,
        routing: &mut [DsrRouting],
        topo: &TopologySnapshot,
        oracle: &dyn RouteOracle,
    ) {
        self.install(routing, topo, oracle);
        self.rebuilds += 1;
    }

    fn install(
        &mut self,
        routing: &mut [DsrRouting],
        topo: &TopologySnapshot,
        oracle: &dyn RouteOracle,
    ) {
        self.state = TableState::Rebuilding;
        let mut fresh: Vec<RouteTable> = vec![RouteTable::new(); routing.len()];
        let tuples = oracle.compute(topo);
        let total = tuples.len();
        for t in tuples {
            if let Some(table) = fresh.get_mut(t.node.0) {
                table.add_host_route_to(t.dest, t.next_hop, t.interface, t.distance);
            }
        }
        for r in routing.iter_mut() {
            let table = fresh
                .get_mut(r.node().0)
                .map(std::mem::take)
                .unwrap_or_default();
            r.replace_table(table);
        }
        self.state = TableState::Stable;
        debug!(routes = total, "路由表已替换");
    }
}
