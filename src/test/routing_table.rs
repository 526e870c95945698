use std::net::Ipv4Addr;

use crate::net::IfIndex;
use crate::routing::{RouteEntry, RouteKind, RouteTable, apply_mask, prefix_mask};

const DST: Ipv4Addr = Ipv4Addr::new(10, 1, 7, 2);

fn gw(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 1, 1, last)
}

#[test]
fn host_routes_shadow_network_and_external_routes() {
    let mut t = RouteTable::new();
    t.add_as_external_route_to(Ipv4Addr::new(10, 0, 0, 0), prefix_mask(8), gw(9), IfIndex(3));
    t.add_network_route_to(Ipv4Addr::new(10, 1, 7, 0), prefix_mask(24), Some(gw(8)), IfIndex(2));
    assert_eq!(t.lookup(DST, None)[0].kind, RouteKind::Network);

    t.add_host_route_to(DST, gw(2), IfIndex(1), 80);
    t.add_host_route_to(DST, gw(3), IfIndex(2), 50);
    let found = t.lookup(DST, None);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|r| r.is_host()));
    assert_eq!(found[0].distance, 80);
    assert_eq!(found[1].distance, 50);
}

#[test]
fn external_route_is_last_resort() {
    let mut t = RouteTable::new();
    t.add_as_external_route_to(Ipv4Addr::new(10, 0, 0, 0), prefix_mask(8), gw(9), IfIndex(3));
    let found = t.lookup(Ipv4Addr::new(10, 200, 0, 1), None);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, RouteKind::AsExternal);
    assert!(t.lookup(Ipv4Addr::new(192, 168, 0, 1), None).is_empty());
}

#[test]
fn lookup_honours_output_interface_constraint() {
    let mut t = RouteTable::new();
    t.add_host_route_to(DST, gw(2), IfIndex(1), 80);
    t.add_host_route_to(DST, gw(3), IfIndex(2), 50);
    let only_if1 = t.lookup(DST, Some(IfIndex(1)));
    assert_eq!(only_if1.len(), 1);
    assert_eq!(only_if1[0].gateway, gw(2));
    assert!(t.lookup(DST, Some(IfIndex(7))).is_empty());
}

#[test]
fn network_entries_are_stored_masked() {
    let e = RouteEntry::network(Ipv4Addr::new(10, 1, 7, 99), prefix_mask(24), None, IfIndex(1));
    assert_eq!(e.dest, Ipv4Addr::new(10, 1, 7, 0));
    assert!(!e.is_gateway());
    assert!(e.matches(DST));
    assert!(!e.matches(Ipv4Addr::new(10, 1, 8, 2)));
    assert_eq!(apply_mask(DST, prefix_mask(16)), Ipv4Addr::new(10, 1, 0, 0));
    assert_eq!(prefix_mask(0), Ipv4Addr::UNSPECIFIED);
    assert_eq!(prefix_mask(32), Ipv4Addr::BROADCAST);
}

#[test]
fn direct_host_route_has_no_gateway() {
    let e = RouteEntry::host_direct(DST, IfIndex(1));
    assert!(e.is_host());
    assert!(!e.is_gateway());
    assert_eq!(e.distance, 0);
}

#[test]
fn indexing_spans_buckets_host_first() {
    let mut t = RouteTable::new();
    t.add_network_route_to(Ipv4Addr::new(10, 1, 7, 0), prefix_mask(24), None, IfIndex(2));
    t.add_host_route_to(DST, gw(2), IfIndex(1), 80);
    assert_eq!(t.n_routes(), 2);
    assert!(t.route(0).is_host());
    assert_eq!(t.route(1).kind, RouteKind::Network);

    let removed = t.remove_route(0);
    assert_eq!(removed.distance, 80);
    assert_eq!(t.n_routes(), 1);
    assert_eq!(t.route(0).kind, RouteKind::Network);

    t.clear();
    assert!(t.is_empty());
}

#[test]
#[should_panic(expected = "out of range")]
fn route_index_out_of_range_panics() {
    let mut t = RouteTable::new();
    t.add_host_route_to(DST, gw(2), IfIndex(1), 80);
    let _ = t.route(1);
}

#[test]
#[should_panic(expected = "out of range")]
fn remove_route_out_of_range_panics() {
    let mut t = RouteTable::new();
    t.remove_route(0);
}
