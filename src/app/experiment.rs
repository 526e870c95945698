//! 按实验描述装配网络、流量与接口事件

use std::net::Ipv4Addr;

use tracing::{info, warn};

use super::{DeadlineTagging, InjectFlow};
use crate::net::{IfIndex, InterfaceEvent, LinkOpts, NetWorld, NodeId, QueueConfig};
use crate::routing::{InterfaceChange, prefix_mask};
use crate::sim::{
    ConfigError, DEFAULT_FAST_QUEUE_PKTS, DEFAULT_SLOW_QUEUE_PKTS, ExperimentSpec,
    InterfaceEventKind, NodeKindSpec, SimTime, Simulator, TopologySpec,
};
use crate::topo::{Grid3x3Opts, build_grid3x3, connect_p2p};

/// 装配结果
#[derive(Debug, Clone)]
pub struct Installed {
    pub nodes: Vec<NodeId>,
    pub flows: usize,
    pub interface_events: usize,
    /// 实验描述里的结束时间（如有）
    pub until: Option<SimTime>,
}

/// 构建拓扑、装载初始路由，并调度所有流量与接口事件。
///
/// 出错时 `world` 可能已部分装配，调用方应丢弃它。
pub fn install_experiment(
    spec: &ExperimentSpec,
    world: &mut NetWorld,
    sim: &mut Simulator,
) -> Result<Installed, ConfigError> {
    let nodes = build_topology(&spec.topology, world)?;
    world
        .net
        .maintenance_mut()
        .set_respond_to_interface_events(spec.respond_to_interface_events);
    world.net.initialize_routes();

    let mut flows = 0;
    for (i, f) in spec.flows.iter().enumerate() {
        let node_at = |n: usize| {
            nodes
                .get(n)
                .copied()
                .ok_or(ConfigError::UnknownFlowNode { flow: i, node: n })
        };
        let src = node_at(f.src)?;
        let dst = node_at(f.dst)?;
        let dst_addr = match f.dst_iface {
            Some(iface) => world.net.address_of(dst, IfIndex(iface)),
            None => world.net.interfaces(dst).primary_address(),
        }
        .ok_or(ConfigError::UnknownFlowInterface {
            flow: i,
            node: f.dst,
            iface: f.dst_iface.unwrap_or(0),
        })?;
        let src_addr = world
            .net
            .interfaces(src)
            .primary_address()
            .unwrap_or(Ipv4Addr::LOCALHOST);
        let Some(gap) = InjectFlow::gap_for_rate(f.pkt_bytes, f.rate_mbps) else {
            warn!(flow = i, rate_mbps = f.rate_mbps, "流速率非正，跳过");
            continue;
        };
        let tagging = f.budget_us.map(|budget_us| DeadlineTagging {
            flag: f.flag,
            budget_us,
        });
        sim.schedule(
            SimTime::from_millis(f.start_ms),
            InjectFlow {
                flow_id: i as u64,
                src,
                src_addr,
                dst_addr,
                pkt_bytes: f.pkt_bytes,
                remaining: f.pkts,
                gap,
                stop: SimTime::from_millis(f.stop_ms),
                tagging,
            },
        );
        flows += 1;
    }

    for (i, ev) in spec.interface_events.iter().enumerate() {
        let node = nodes
            .get(ev.node)
            .copied()
            .ok_or(ConfigError::UnknownEventNode {
                event: i,
                node: ev.node,
            })?;
        let (change, address) = match ev.kind {
            InterfaceEventKind::Up => (InterfaceChange::Up, None),
            InterfaceEventKind::Down => (InterfaceChange::Down, None),
            InterfaceEventKind::RemoveAddress => (InterfaceChange::RemoveAddress, None),
            InterfaceEventKind::AddAddress => {
                let addr = ev.address.ok_or(ConfigError::MissingAddress(i))?;
                let mask = prefix_mask(ev.prefix_len.unwrap_or(24));
                (InterfaceChange::AddAddress, Some((addr, mask)))
            }
        };
        sim.schedule(
            SimTime::from_millis(ev.at_ms),
            InterfaceEvent {
                node,
                iface: IfIndex(ev.iface),
                change,
                address,
            },
        );
    }

    world.net.log_summary();
    info!(
        flows,
        interface_events = spec.interface_events.len(),
        respond = spec.respond_to_interface_events,
        "📋 实验已装配"
    );
    Ok(Installed {
        nodes,
        flows,
        interface_events: spec.interface_events.len(),
        until: spec.until_ms.map(SimTime::from_millis),
    })
}

fn build_topology(topo: &TopologySpec, world: &mut NetWorld) -> Result<Vec<NodeId>, ConfigError> {
    match topo {
        TopologySpec::Grid3x3 {
            fast_queue_pkts,
            slow_queue_pkts,
        } => {
            let opts = Grid3x3Opts {
                fast_queue_pkts: fast_queue_pkts.unwrap_or(DEFAULT_FAST_QUEUE_PKTS),
                slow_queue_pkts: slow_queue_pkts.unwrap_or(DEFAULT_SLOW_QUEUE_PKTS),
            };
            Ok(build_grid3x3(world, &opts))
        }
        TopologySpec::Custom { nodes, links } => {
            if links.len() > 254 {
                return Err(ConfigError::TooManyLinks(links.len()));
            }
            for (i, l) in links.iter().enumerate() {
                for n in [l.a, l.b] {
                    if n >= nodes.len() {
                        return Err(ConfigError::UnknownLinkNode { link: i, node: n });
                    }
                }
                if l.a == l.b {
                    return Err(ConfigError::SelfLoop(i));
                }
            }
            let ids: Vec<NodeId> = nodes
                .iter()
                .map(|n| match n.kind {
                    NodeKindSpec::Router => world.net.add_router(n.name.clone()),
                    NodeKindSpec::Host => world.net.add_host(n.name.clone()),
                })
                .collect();
            for (i, l) in links.iter().enumerate() {
                let opts = LinkOpts {
                    latency: SimTime::from_micros(l.latency_us),
                    bandwidth_bps: l.bandwidth_mbps.saturating_mul(1_000_000),
                    metric_us: l.metric(),
                    queue: QueueConfig::TwoClass {
                        fast_pkts: l.fast_queue_pkts.unwrap_or(DEFAULT_FAST_QUEUE_PKTS),
                        slow_pkts: l.slow_queue_pkts.unwrap_or(DEFAULT_SLOW_QUEUE_PKTS),
                    },
                };
                connect_p2p(&mut world.net, ids[l.a], ids[l.b], (i + 1) as u8, &opts);
            }
            Ok(ids)
        }
    }
}
