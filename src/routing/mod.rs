//! 路由模块
//!
//! 路由表、预算感知的转发决策、全局路由计算与接口事件触发的重建。

mod decision;
mod dump;
mod entry;
mod maintenance;
mod oracle;
mod table;

pub use decision::{
    DsrRouting, Forwarder, InputAction, PRIORITY_GUARD_US, RouteDecision, RouteError,
    RoutingContext, SocketErrno, select_shortest,
};
pub use dump::{DUMP_HEADER, format_routing_table};
pub use entry::{HOST_MASK, RouteEntry, RouteKind, apply_mask, prefix_mask};
pub use maintenance::{InterfaceChange, TableMaintenance, TableState};
pub use oracle::{
    GlobalRouteOracle, IfaceSnapshot, LinkSnapshot, NodeSnapshot, RouteOracle, RouteTuple,
    TopologySnapshot,
};
pub use table::RouteTable;
