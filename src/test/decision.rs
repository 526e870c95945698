use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::net::{IfIndex, NodeId, PRIORITY_HIGH, PRIORITY_LOW, Packet, PacketTags};
use crate::queue::{Headroom, QueueInspector, SubQueueState};
use crate::routing::{
    DsrRouting, Forwarder, InputAction, RouteError, RoutingContext, SocketErrno,
};
use crate::sim::SimTime;

const D: Ipv4Addr = Ipv4Addr::new(10, 1, 9, 2);
const A: NodeId = NodeId(0);
const B: NodeId = NodeId(1);
const C: NodeId = NodeId(2);

#[derive(Default)]
struct FakeQueues(HashMap<IfIndex, Headroom>);

impl QueueInspector for FakeQueues {
    fn headroom(&self, iface: IfIndex) -> Option<Headroom> {
        self.0.get(&iface).copied()
    }
}

/// A 通过 if1 连 B、if2 连 C；B、C 各自通过 if1 连到 D 的拥有者（不在此网络里建模）。
struct FakeNet {
    routing: Vec<DsrRouting>,
    queues: Vec<FakeQueues>,
    peers: HashMap<(NodeId, IfIndex), (NodeId, IfIndex)>,
    owned: HashMap<NodeId, Vec<Ipv4Addr>>,
    no_forward: Vec<NodeId>,
}

fn roomy() -> Headroom {
    Headroom {
        fast: SubQueueState { current: 0, max: 35 },
        slow: SubQueueState { current: 0, max: 35 },
    }
}

fn gw(k: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 1, k, 2)
}

impl FakeNet {
    /// A 到 D 的两条路由：if1 距离 `d1`，if2 距离 `d2`；所有队列都空。
    fn two_paths(d1: u32, d2: u32) -> Self {
        let mut routing: Vec<DsrRouting> = (0..4).map(|i| DsrRouting::new(NodeId(i))).collect();
        routing[0].table_mut().add_host_route_to(D, gw(1), IfIndex(1), d1);
        routing[0].table_mut().add_host_route_to(D, gw(2), IfIndex(2), d2);
        routing[1].table_mut().add_host_route_to(D, gw(3), IfIndex(1), 10);
        routing[2].table_mut().add_host_route_to(D, gw(4), IfIndex(1), 10);

        let mut queues: Vec<FakeQueues> = (0..4).map(|_| FakeQueues::default()).collect();
        for (n, i) in [(0, 1), (0, 2), (1, 1), (2, 1)] {
            queues[n].0.insert(IfIndex(i), roomy());
        }
        let peers = HashMap::from([
            ((A, IfIndex(1)), (B, IfIndex(2))),
            ((A, IfIndex(2)), (C, IfIndex(2))),
            ((B, IfIndex(1)), (NodeId(3), IfIndex(1))),
            ((C, IfIndex(1)), (NodeId(3), IfIndex(2))),
        ]);
        let owned = HashMap::from([(NodeId(3), vec![D])]);
        Self {
            routing,
            queues,
            peers,
            owned,
            no_forward: Vec::new(),
        }
    }

    fn set_headroom(&mut self, node: NodeId, iface: u32, fast: (u32, u32), slow: (u32, u32)) {
        self.queues[node.0].0.insert(
            IfIndex(iface),
            Headroom {
                fast: SubQueueState {
                    current: fast.0,
                    max: fast.1,
                },
                slow: SubQueueState {
                    current: slow.0,
                    max: slow.1,
                },
            },
        );
    }

    fn a(&self) -> &DsrRouting {
        &self.routing[0]
    }
}

impl RoutingContext for FakeNet {
    fn peer(&self, node: NodeId, iface: IfIndex) -> Option<(NodeId, IfIndex)> {
        self.peers.get(&(node, iface)).copied()
    }

    fn forwarder(&self, node: NodeId) -> Option<&dyn Forwarder> {
        self.routing.get(node.0).map(|r| r as &dyn Forwarder)
    }

    fn queues(&self, node: NodeId) -> Option<&dyn QueueInspector> {
        self.queues.get(node.0).map(|q| q as &dyn QueueInspector)
    }

    fn owns_address(&self, node: NodeId, addr: Ipv4Addr) -> bool {
        self.owned.get(&node).is_some_and(|v| v.contains(&addr))
    }

    fn local_address(&self, node: NodeId, iface: IfIndex) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::new(10, 1, iface.0 as u8, node.0 as u8 + 1))
    }

    fn forwarding_enabled(&self, node: NodeId, _iface: IfIndex) -> bool {
        !self.no_forward.contains(&node)
    }
}

fn deadline_pkt(budget: u32, ts: u64) -> Packet {
    Packet::new(1, 0, 52, Ipv4Addr::new(10, 1, 1, 1), D)
        .with_tags(PacketTags::deadline(true, budget, ts))
}

#[test]
fn picks_shortest_feasible_route_and_stamps_tags() {
    let net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("route");
    assert_eq!(d.distance, 50);
    assert_eq!(d.interface, IfIndex(1));
    assert_eq!(d.gateway, gw(1));
    assert_eq!(d.destination, D);
    assert_eq!(d.source, Ipv4Addr::new(10, 1, 1, 1));
    assert_eq!(pkt.tags.distance_us, Some(50));
    assert_eq!(pkt.tags.priority, Some(PRIORITY_HIGH));
    // 源端写入的标签不变
    assert_eq!(pkt.tags.budget_us, Some(100));
    assert_eq!(pkt.tags.timestamp_us, Some(0));
}

#[test]
fn no_route_when_slack_below_every_distance() {
    let net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(100, 0);
    let res = net
        .a()
        .route_output(&mut pkt, None, SimTime::from_micros(60), &net);
    assert_eq!(
        res,
        Err(RouteError::NoFeasibleRoute {
            dst: D,
            slack_us: 40
        })
    );
    assert_eq!(SocketErrno::of(&res), SocketErrno::NoRouteToHost);
    assert_eq!(pkt.tags.distance_us, None);
    assert_eq!(pkt.tags.priority, None);
}

#[test]
fn distance_equal_to_slack_is_infeasible() {
    let net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(100, 0);
    let res = net
        .a()
        .route_output(&mut pkt, None, SimTime::from_micros(50), &net);
    assert!(matches!(res, Err(RouteError::NoFeasibleRoute { slack_us: 50, .. })));
}

#[test]
fn missed_deadline_is_dropped() {
    let net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(100, 0);
    let res = net
        .a()
        .route_output(&mut pkt, None, SimTime::from_micros(130), &net);
    assert_eq!(res, Err(RouteError::DeadlineExceeded { late_us: 30 }));
}

#[test]
fn congested_local_queue_rejects_the_only_route() {
    let mut net = FakeNet::two_paths(30, 30);
    net.routing[0].table_mut().clear();
    net.routing[0]
        .table_mut()
        .add_host_route_to(D, gw(1), IfIndex(1), 30);
    net.set_headroom(A, 1, (34, 35), (35, 35));

    let mut pkt = deadline_pkt(50, 0);
    let res = net.a().route_output(&mut pkt, None, SimTime::ZERO, &net);
    assert_eq!(
        res,
        Err(RouteError::CongestionRejected {
            dst: D,
            candidates: 1
        })
    );
}

#[test]
fn either_near_full_sub_queue_rejects_candidate() {
    let mut net = FakeNet::two_paths(50, 80);
    // 只有 slow 接近满也不行
    net.set_headroom(A, 1, (0, 35), (34, 35));
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("fallback route");
    assert_eq!(d.distance, 80);
    assert_eq!(d.interface, IfIndex(2));
    assert_eq!(pkt.tags.distance_us, Some(80));
    assert_eq!(pkt.tags.priority, Some(PRIORITY_HIGH));
}

#[test]
fn downstream_lookahead_rejects_overloaded_next_hop() {
    let mut net = FakeNet::two_paths(50, 80);
    // B 往 D 的出队列接近满：A 的 50 路由被判过载
    net.set_headroom(B, 1, (34, 35), (0, 35));
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("route via C");
    assert_eq!(d.interface, IfIndex(2));

    net.set_headroom(C, 1, (0, 35), (35, 35));
    let mut pkt = deadline_pkt(100, 0);
    let res = net.a().route_output(&mut pkt, None, SimTime::ZERO, &net);
    assert_eq!(
        res,
        Err(RouteError::CongestionRejected {
            dst: D,
            candidates: 2
        })
    );
}

#[test]
fn downstream_without_route_rejects_candidate() {
    let mut net = FakeNet::two_paths(50, 80);
    net.routing[1].table_mut().clear();
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("route via C");
    assert_eq!(d.distance, 80);
}

#[test]
fn non_forwarding_next_hop_is_skipped() {
    let mut net = FakeNet::two_paths(50, 80);
    net.no_forward.push(B);
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("route via C");
    assert_eq!(d.interface, IfIndex(2));
    assert_eq!(pkt.tags.distance_us, Some(80));

    net.no_forward.push(C);
    let mut pkt = deadline_pkt(100, 0);
    assert_eq!(
        net.a().route_output(&mut pkt, None, SimTime::ZERO, &net),
        Err(RouteError::CongestionRejected {
            dst: D,
            candidates: 2
        })
    );
}

#[test]
fn non_forwarding_next_hop_that_owns_destination_is_accepted() {
    let mut net = FakeNet::two_paths(50, 80);
    net.owned.insert(B, vec![D]);
    net.no_forward.push(B);
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("owner");
    assert_eq!(d.interface, IfIndex(1));
}

#[test]
fn budget_mode_ignores_network_routes() {
    let mut net = FakeNet::two_paths(50, 80);
    let far = Ipv4Addr::new(172, 16, 0, 9);
    net.routing[0].table_mut().add_network_route_to(
        Ipv4Addr::new(172, 16, 0, 0),
        Ipv4Addr::new(255, 255, 0, 0),
        Some(gw(1)),
        IfIndex(1),
    );
    let mut pkt = deadline_pkt(100, 0);
    pkt.dst = far;
    assert_eq!(
        net.a().route_output(&mut pkt, None, SimTime::ZERO, &net),
        Err(RouteError::NoRoute { dst: far })
    );
    assert_eq!(pkt.tags.priority, None);
    assert_eq!(pkt.tags.distance_us, None);

    let mut plain = Packet::new(2, 0, 52, Ipv4Addr::new(10, 1, 1, 1), far);
    let d = net
        .a()
        .route_output(&mut plain, None, SimTime::ZERO, &net)
        .expect("network route");
    assert_eq!(d.gateway, gw(1));
}

#[test]
fn peer_owning_destination_needs_only_local_headroom() {
    let mut net = FakeNet::two_paths(50, 80);
    net.owned.insert(B, vec![D]);
    net.routing[1].table_mut().clear();
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("direct to owner");
    assert_eq!(d.distance, 50);
}

#[test]
fn priority_guard_boundary() {
    // 松弛量 100，距离 89/90/91 => S-R = 11/10/9
    for (distance, expected) in [(89, PRIORITY_HIGH), (90, PRIORITY_LOW), (91, PRIORITY_LOW)] {
        let net = FakeNet::two_paths(distance, 95);
        let mut pkt = deadline_pkt(100, 0);
        net.a()
            .route_output(&mut pkt, None, SimTime::ZERO, &net)
            .expect("route");
        assert_eq!(pkt.tags.priority, Some(expected), "distance {distance}");
    }
}

#[test]
fn previous_hop_distance_clamps_slack() {
    let net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(1_000, 0);
    pkt.tags.distance_us = Some(60);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("route");
    assert_eq!(d.distance, 50);
    assert!(pkt.tags.distance_us.expect("distance") <= 60);
    // 60 - 50 = 10，不超过保护余量
    assert_eq!(pkt.tags.priority, Some(PRIORITY_LOW));

    let mut pkt = deadline_pkt(1_000, 0);
    pkt.tags.distance_us = Some(50);
    assert!(matches!(
        net.a().route_output(&mut pkt, None, SimTime::ZERO, &net),
        Err(RouteError::NoFeasibleRoute { slack_us: 50, .. })
    ));
}

#[test]
fn decision_is_idempotent_for_identical_state() {
    let net = FakeNet::two_paths(50, 80);
    let now = SimTime::from_micros(7);
    let mut p1 = deadline_pkt(100, 0);
    let mut p2 = p1.clone();
    let r1 = net.a().route_output(&mut p1, None, now, &net);
    let r2 = net.a().route_output(&mut p2, None, now, &net);
    assert_eq!(r1, r2);
    assert_eq!(p1.tags, p2.tags);
}

#[test]
fn ties_keep_the_earliest_entry() {
    let net = FakeNet::two_paths(50, 50);
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, None, SimTime::ZERO, &net)
        .expect("route");
    assert_eq!(d.interface, IfIndex(1));

    let mut bare = Packet::new(2, 0, 52, Ipv4Addr::new(10, 1, 1, 1), D);
    let d = net
        .a()
        .route_output(&mut bare, None, SimTime::ZERO, &net)
        .expect("route");
    assert_eq!(d.interface, IfIndex(1));
}

#[test]
fn untagged_packets_ignore_queue_occupancy() {
    let mut net = FakeNet::two_paths(50, 80);
    net.set_headroom(A, 1, (35, 35), (35, 35));
    net.set_headroom(A, 2, (35, 35), (35, 35));

    let mut bare = Packet::new(2, 0, 52, Ipv4Addr::new(10, 1, 1, 1), D);
    let d = net
        .a()
        .route_output(&mut bare, None, SimTime::from_secs(1), &net)
        .expect("simple route");
    assert_eq!(d.distance, 50);
    assert_eq!(bare.tags, PacketTags::default());

    // 缺 flag：按简单模式处理
    let mut partial = deadline_pkt(100, 0);
    partial.tags.flag = None;
    let d = net
        .a()
        .route_output(&mut partial, None, SimTime::from_secs(1), &net)
        .expect("simple route");
    assert_eq!(d.distance, 50);
    assert_eq!(partial.tags.priority, None);
}

#[test]
fn zero_budget_or_zero_size_uses_simple_mode_on_output() {
    let mut net = FakeNet::two_paths(50, 80);
    net.set_headroom(A, 1, (35, 35), (35, 35));

    let mut zero_budget = deadline_pkt(0, 0);
    let d = net
        .a()
        .route_output(&mut zero_budget, None, SimTime::from_secs(1), &net)
        .expect("simple route");
    assert_eq!(d.distance, 50);

    let mut empty = deadline_pkt(100, 0);
    empty.size_bytes = 0;
    let d = net
        .a()
        .route_output(&mut empty, None, SimTime::ZERO, &net)
        .expect("simple route");
    assert_eq!(d.distance, 50);
    assert_eq!(empty.tags.distance_us, None);
}

#[test]
fn output_interface_constraint_limits_candidates() {
    let net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(100, 0);
    let d = net
        .a()
        .route_output(&mut pkt, Some(IfIndex(2)), SimTime::ZERO, &net)
        .expect("route");
    assert_eq!(d.interface, IfIndex(2));
}

#[test]
fn route_input_delivers_forwards_or_drops() {
    let mut net = FakeNet::two_paths(50, 80);
    let mut pkt = deadline_pkt(100, 0);
    match net.a().route_input(&mut pkt, IfIndex(3), SimTime::ZERO, &net) {
        InputAction::Forward(d) => assert_eq!(d.distance, 50),
        other => panic!("unexpected {other:?}"),
    }

    net.owned.insert(A, vec![D]);
    let mut pkt = deadline_pkt(100, 0);
    assert_eq!(
        net.a().route_input(&mut pkt, IfIndex(3), SimTime::ZERO, &net),
        InputAction::LocalDeliver
    );

    net.owned.remove(&A);
    net.no_forward.push(A);
    let mut pkt = deadline_pkt(100, 0);
    assert_eq!(
        net.a().route_input(&mut pkt, IfIndex(3), SimTime::ZERO, &net),
        InputAction::Drop(RouteError::ForwardingDisabled { iif: IfIndex(3) })
    );
}

#[test]
fn forwarder_decide_collapses_errors_to_none() {
    let net = FakeNet::two_paths(50, 80);
    let mut tags = PacketTags::deadline(true, 100, 0);
    assert!(
        net.a()
            .decide(D, None, &mut tags, SimTime::from_micros(200), &net)
            .is_none()
    );
    let mut tags = PacketTags::default();
    let d = net
        .a()
        .decide(D, None, &mut tags, SimTime::ZERO, &net)
        .expect("simple");
    assert_eq!(d.distance, 50);
    assert!(
        net.a()
            .decide(Ipv4Addr::new(192, 168, 1, 1), None, &mut tags, SimTime::ZERO, &net)
            .is_none()
    );
}
