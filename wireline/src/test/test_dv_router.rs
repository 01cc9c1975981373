// Wireline: Routing and Reliable Transport Cores
// Copyright (C) 2024  The Wireline Developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use crate::routing::packet::{Packet, RoutingPayload};
use crate::routing::types::{Address, Cost, DeviceError};
use crate::routing::{DvRouter, Router, SendQueue};
use maplit::btreemap;
use std::collections::BTreeMap;

fn addr(s: &str) -> Address {
    Address::from(s)
}

/// Build the routing packet `from` would send to `to`, advertising the
/// given distance vector.
fn dv_update(from: &str, to: &str, entries: &[(&str, Cost)]) -> Packet {
    let dv: BTreeMap<Address, Cost> = entries.iter().map(|(a, c)| (addr(a), *c)).collect();
    Packet::routing(addr(from), addr(to), &RoutingPayload::DvUpdate { addr: addr(from), dv })
}

fn decode_dv(packet: &Packet) -> (Address, BTreeMap<Address, Cost>) {
    match RoutingPayload::decode(&packet.content).unwrap() {
        RoutingPayload::DvUpdate { addr, dv } => (addr, dv),
        other => panic!("expected a distance-vector update, got {:?}", other),
    }
}

#[test]
fn two_node_link_up() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();

    assert_eq!(a.dv, btreemap! { addr("A") => 0, addr("B") => 1 });
    assert_eq!(a.next_port(&addr("B")), Some(1));

    // the announcement to B must not contain B itself (poisoned reverse)
    assert_eq!(out.len(), 1);
    let (port, packet) = out.pop_front().unwrap();
    assert_eq!(port, 1);
    let (origin, dv) = decode_dv(&packet);
    assert_eq!(origin, addr("A"));
    assert_eq!(dv, btreemap! { addr("A") => 0 });

    // deliver it to B, which already brought up the reverse link
    let mut b = DvRouter::new(addr("B"), 1000);
    let mut bout = SendQueue::new();
    b.handle_new_link(7, addr("A"), 1, &mut bout).unwrap();
    bout.clear();
    b.handle_packet(7, packet, &mut bout).unwrap();

    assert_eq!(b.dv, btreemap! { addr("B") => 0, addr("A") => 1 });
    assert_eq!(b.next_port(&addr("A")), Some(7));
    // nothing improved on B's side, so it stays quiet
    assert!(bout.is_empty());
}

#[test]
fn poisoned_reverse_omits_routes_through_the_peer() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    out.clear();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();

    assert_eq!(a.dv, btreemap! { addr("A") => 0, addr("B") => 1, addr("C") => 2 });
    assert_eq!(a.next_port(&addr("C")), Some(1));

    // both B and C are routed through port 1, so the broadcast to B keeps
    // only the own entry
    assert_eq!(out.len(), 1);
    let (_, packet) = out.pop_front().unwrap();
    let (_, dv) = decode_dv(&packet);
    assert_eq!(dv, btreemap! { addr("A") => 0 });
}

#[test]
fn relaxation_never_installs_unreachable_paths() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    out.clear();

    // B claims D at cost 15; adding the link cost reaches INF = 16
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("D", 15)]), &mut out).unwrap();

    assert!(!a.dv.contains_key(&addr("D")));
    assert_eq!(a.next_port(&addr("D")), None);
    assert!(out.is_empty());
}

#[test]
fn withdrawn_destination_is_bad_news() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();
    out.clear();

    // B withdraws C by omitting it
    a.handle_packet(1, dv_update("B", "A", &[("B", 0)]), &mut out).unwrap();

    assert_eq!(a.dv, btreemap! { addr("A") => 0, addr("B") => 1 });
    assert_eq!(a.next_port(&addr("C")), None);
    // the recomputation is announced
    assert_eq!(out.len(), 1);
}

#[test]
fn cost_increase_is_bad_news_and_reinstalls_the_worse_path() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();
    assert_eq!(a.dv[&addr("C")], 2);
    out.clear();

    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 5)]), &mut out).unwrap();

    // the wipe re-relaxes against the freshly cached vector
    assert_eq!(a.dv[&addr("C")], 6);
    assert_eq!(a.next_port(&addr("C")), Some(1));
    assert_eq!(out.len(), 1);
}

#[test]
fn bad_news_falls_back_to_cached_alternatives() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    a.handle_new_link(2, addr("E"), 2, &mut out).unwrap();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();
    a.handle_packet(2, dv_update("E", "A", &[("E", 0), ("C", 1)]), &mut out).unwrap();
    assert_eq!(a.next_port(&addr("C")), Some(1));
    out.clear();

    // B loses C; the cached vector from E provides the fallback route
    a.handle_packet(1, dv_update("B", "A", &[("B", 0)]), &mut out).unwrap();

    assert_eq!(a.dv[&addr("C")], 3);
    assert_eq!(a.next_port(&addr("C")), Some(2));
}

#[test]
fn new_destination_alone_is_good_news() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();
    out.clear();

    // a new destination with everything else unchanged must not wipe
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1), ("D", 2)]), &mut out).unwrap();

    assert_eq!(a.dv[&addr("C")], 2);
    assert_eq!(a.dv[&addr("D")], 3);
    assert_eq!(out.len(), 1);
}

#[test]
fn remove_link_drops_neighbor_and_routes() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();
    out.clear();

    a.handle_remove_link(1, &mut out).unwrap();

    assert_eq!(a.dv, btreemap! { addr("A") => 0 });
    assert_eq!(a.next_port(&addr("B")), None);
    // no neighbors are left to notify
    assert!(out.is_empty());

    // a second removal of the same port is an invariant violation
    assert_eq!(a.handle_remove_link(1, &mut out), Err(DeviceError::PortNotConnected(1)));
}

#[test]
fn heartbeat_rebroadcasts_periodically() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    out.clear();

    a.handle_time(999, &mut out).unwrap();
    assert!(out.is_empty());
    a.handle_time(1000, &mut out).unwrap();
    assert_eq!(out.len(), 1);
    out.clear();
    a.handle_time(1500, &mut out).unwrap();
    assert!(out.is_empty());
    a.handle_time(2000, &mut out).unwrap();
    assert_eq!(out.len(), 1);
}

#[test]
fn data_packets_follow_the_forwarding_table() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    a.handle_packet(1, dv_update("B", "A", &[("B", 0), ("C", 1)]), &mut out).unwrap();
    out.clear();

    let probe = Packet::data(addr("X"), addr("C"), "probe");
    a.handle_packet(2, probe.clone(), &mut out).unwrap();
    assert_eq!(out.pop_front(), Some((1, probe)));

    // unknown destinations are dropped silently
    a.handle_packet(2, Packet::data(addr("X"), addr("Z"), "probe"), &mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn routing_packet_on_unbound_port_is_rejected() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    let result = a.handle_packet(3, dv_update("B", "A", &[("B", 0)]), &mut out);
    assert_eq!(result, Err(DeviceError::PortNotConnected(3)));
}

#[test]
fn origin_mismatch_is_rejected() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    let result = a.handle_packet(1, dv_update("E", "A", &[("E", 0)]), &mut out);
    assert_eq!(
        result,
        Err(DeviceError::UnexpectedOrigin { port: 1, expected: addr("B"), found: addr("E") })
    );
}

#[test]
fn debug_string_is_valid_json() {
    let mut a = DvRouter::new(addr("A"), 1000);
    let mut out = SendQueue::new();
    a.handle_new_link(1, addr("B"), 1, &mut out).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&a.debug_string()).unwrap();
    assert!(snapshot.get("dv").is_some());
    assert!(snapshot.get("fwd").is_some());
}
