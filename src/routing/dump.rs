//! 路由表文本输出（仿 `route -n`），仅用于诊断。

use std::fmt::Write as _;

use super::table::RouteTable;
use crate::net::NodeId;
use crate::sim::SimTime;

pub const DUMP_HEADER: &str =
    "Destination     Gateway         Genmask         Flags Metric Ref    Use Iface";

/// 输出一个节点的路由表；`iface_name` 为接口提供可选名字，否则打印序号。
pub fn format_routing_table(
    node: NodeId,
    now: SimTime,
    table: &RouteTable,
    iface_name: impl Fn(crate::net::IfIndex) -> Option<String>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Node: {}, Time: +{:.6}s, Ipv4DSRRouting table",
        node.0,
        now.as_secs_f64()
    );
    if table.n_routes() > 0 {
        let _ = writeln!(out, "{DUMP_HEADER}");
        for r in table.iter() {
            let mut flags = String::from("U");
            if r.is_host() {
                flags.push('H');
            } else if r.is_gateway() {
                flags.push('G');
            }
            let _ = write!(
                out,
                "{:<16}{:<16}{:<16}{:<6}{:<16}-      -   ",
                r.dest.to_string(),
                r.gateway.to_string(),
                r.mask.to_string(),
                flags,
                r.distance
            );
            match iface_name(r.interface) {
                Some(name) if !name.is_empty() => {
                    let _ = writeln!(out, "{name}");
                }
                _ => {
                    let _ = writeln!(out, "{}", r.interface);
                }
            }
        }
    }
    out.push('\n');
    out
}
