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

//! Module defining a router running the link-state protocol.

use crate::routing::event::SendQueue;
use crate::routing::packet::{Packet, PacketKind, RoutingPayload};
use crate::routing::types::{Address, Cost, DeviceError, Port, INF};
use crate::routing::Router;
use log::*;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap, HashMap};

/// Bookkeeping attached to every node of the topology graph.
#[derive(Debug, Clone)]
struct NodeInfo {
    /// Address of the node
    addr: Address,
    /// Local port of the link to this node, if it is a direct neighbor
    port: Option<Port>,
    /// Highest advertisement sequence number seen from this origin.
    /// Non-decreasing over the lifetime of the router.
    last_packet_id: Option<u64>,
}

/// The network as this router currently understands it: a directed graph
/// with link costs on the edges.
type Topology = StableGraph<NodeInfo, Cost, Directed, u32>;

/// Link-state router.
///
/// The router keeps an owned graph of the whole network, learned from
/// flooded link-state advertisements, and recomputes shortest paths from
/// itself whenever the graph changes. Advertisements are versioned per
/// origin; an advertisement is accepted and re-flooded at most once.
#[derive(Debug)]
pub struct LsRouter {
    /// Own address
    addr: Address,
    /// Interval between periodic broadcasts
    heartbeat_ms: u64,
    /// Time of the last periodic broadcast
    last_heartbeat: u64,
    /// Sequence number of the next self-originated advertisement
    next_packet_id: u64,
    /// Everything this router knows about the network topology
    graph: Topology,
    /// Address to graph index. The own address is always present.
    nodes: HashMap<Address, NodeIndex>,
    /// Graph index of the own node
    self_idx: NodeIndex,
    /// Destination to outgoing port, rebuilt from the graph on every change
    pub(crate) fwd_table: BTreeMap<Address, Port>,
}

impl Router for LsRouter {
    fn new(addr: Address, heartbeat_ms: u64) -> Self {
        let mut graph = Topology::default();
        let self_idx =
            graph.add_node(NodeInfo { addr: addr.clone(), port: None, last_packet_id: None });
        let mut nodes = HashMap::new();
        nodes.insert(addr.clone(), self_idx);
        Self {
            addr,
            heartbeat_ms,
            last_heartbeat: 0,
            next_packet_id: 0,
            graph,
            nodes,
            self_idx,
            fwd_table: BTreeMap::new(),
        }
    }

    fn address(&self) -> &Address {
        &self.addr
    }

    fn handle_new_link(
        &mut self,
        port: Port,
        addr: Address,
        cost: Cost,
        out: &mut SendQueue,
    ) -> Result<(), DeviceError> {
        debug!("{}: new link on port {} to {} (cost {})", self.addr, port, addr, cost);
        let idx = self.ensure_node(&addr);
        self.graph[idx].port = Some(port);
        self.graph.update_edge(self.self_idx, idx, cost);
        self.recompute_paths()?;
        self.broadcast_own_lsa(out)
    }

    fn handle_packet(
        &mut self,
        port: Port,
        packet: Packet,
        out: &mut SendQueue,
    ) -> Result<(), DeviceError> {
        if packet.kind == PacketKind::Data {
            match self.next_port(&packet.dst) {
                Some(out_port) => out.push_back((out_port, packet)),
                None => debug!("{}: no route to {}, dropping data packet", self.addr, packet.dst),
            }
            return Ok(());
        }

        let (source_addr, packet_id, ls_neighbors) = match RoutingPayload::decode(&packet.content)?
        {
            RoutingPayload::LsAdvertisement { source_addr, packet_id, ls_neighbors } => {
                (source_addr, packet_id, ls_neighbors)
            }
            RoutingPayload::DvUpdate { .. } => {
                return Err(DeviceError::MalformedPayload(
                    "expected a link-state advertisement".to_string(),
                ))
            }
        };

        let stale = self.last_packet_id(&source_addr).map_or(false, |last| packet_id <= last);
        if source_addr == self.addr || stale {
            trace!(
                "{}: dropping stale or own advertisement from {} (id {})",
                self.addr,
                source_addr,
                packet_id
            );
            return Ok(());
        }

        let origin_idx = self.ensure_node(&source_addr);
        self.graph[origin_idx].last_packet_id = Some(packet_id);

        for (dest_addr, cost) in ls_neighbors {
            let dest_idx = self.ensure_node(&dest_addr);
            if cost == INF {
                if let Some(edge) = self.graph.find_edge(origin_idx, dest_idx) {
                    self.graph.remove_edge(edge);
                }
            } else {
                self.graph.update_edge(origin_idx, dest_idx, cost);
            }
        }
        self.recompute_paths()?;

        // re-flood the advertisement unchanged, except through the port it
        // arrived on
        let mut targets = Vec::new();
        for edge in self.graph.edges(self.self_idx) {
            let info = &self.graph[edge.target()];
            let nb_port =
                info.port.ok_or_else(|| DeviceError::NoPortBinding(info.addr.clone()))?;
            if nb_port != port {
                targets.push(nb_port);
            }
        }
        for target in targets {
            out.push_back((target, packet.clone()));
        }
        Ok(())
    }

    fn handle_remove_link(&mut self, port: Port, out: &mut SendQueue) -> Result<(), DeviceError> {
        let mut removed = None;
        for edge in self.graph.edges(self.self_idx) {
            if self.graph[edge.target()].port == Some(port) {
                removed = Some(edge.id());
                break;
            }
        }
        let edge = removed.ok_or(DeviceError::PortNotConnected(port))?;
        debug!("{}: link on port {} removed", self.addr, port);

        // advertise the edge at INF first, so peers drop it, then delete it
        // from the local graph
        if let Some(weight) = self.graph.edge_weight_mut(edge) {
            *weight = INF;
        }
        self.broadcast_own_lsa(out)?;
        self.graph.remove_edge(edge);
        self.recompute_paths()
    }

    fn handle_time(&mut self, now_ms: u64, out: &mut SendQueue) -> Result<(), DeviceError> {
        if now_ms.saturating_sub(self.last_heartbeat) >= self.heartbeat_ms {
            self.last_heartbeat = now_ms;
            self.broadcast_own_lsa(out)?;
        }
        Ok(())
    }

    fn next_port(&self, dst: &Address) -> Option<Port> {
        self.fwd_table.get(dst).copied()
    }

    fn debug_string(&self) -> String {
        let nodes: Vec<_> = self
            .graph
            .node_indices()
            .map(|idx| {
                let info = &self.graph[idx];
                serde_json::json!({
                    "addr": info.addr,
                    "port": info.port,
                    "last_packet_id": info.last_packet_id,
                })
            })
            .collect();
        let edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (a, b) = self.graph.edge_endpoints(edge)?;
                let weight = self.graph.edge_weight(edge)?;
                Some(serde_json::json!([self.graph[a].addr, self.graph[b].addr, weight]))
            })
            .collect();
        serde_json::json!({ "fwd": &self.fwd_table, "nodes": nodes, "edges": edges }).to_string()
    }
}

impl LsRouter {
    /// Look up the node for an address, creating it if the address is not
    /// yet known. A freshly created node has no port and no sequence number.
    fn ensure_node(&mut self, addr: &Address) -> NodeIndex {
        match self.nodes.get(addr) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(NodeInfo {
                    addr: addr.clone(),
                    port: None,
                    last_packet_id: None,
                });
                self.nodes.insert(addr.clone(), idx);
                idx
            }
        }
    }

    /// Highest advertisement sequence number seen from `addr`, or `None` if
    /// this origin never advertised anything.
    fn last_packet_id(&self, addr: &Address) -> Option<u64> {
        self.nodes.get(addr).and_then(|&idx| self.graph[idx].last_packet_id)
    }

    /// Flood a fresh advertisement of the own direct links to every live
    /// neighbor, consuming the next sequence number.
    fn broadcast_own_lsa(&mut self, out: &mut SendQueue) -> Result<(), DeviceError> {
        let mut ls_neighbors = Vec::new();
        let mut targets = Vec::new();
        for edge in self.graph.edges(self.self_idx) {
            let info = &self.graph[edge.target()];
            let nb_port =
                info.port.ok_or_else(|| DeviceError::NoPortBinding(info.addr.clone()))?;
            ls_neighbors.push((info.addr.clone(), *edge.weight()));
            targets.push((nb_port, info.addr.clone()));
        }
        let payload = RoutingPayload::LsAdvertisement {
            source_addr: self.addr.clone(),
            packet_id: self.next_packet_id,
            ls_neighbors,
        };
        self.next_packet_id += 1;
        for (port, nb_addr) in targets {
            out.push_back((port, Packet::routing(self.addr.clone(), nb_addr, &payload)));
        }
        Ok(())
    }

    /// Recompute shortest paths from this router and rewrite the forwarding
    /// table. Dijkstra over the current edge costs, with a binary heap keyed
    /// by tentative cost; ties are broken by address ordering so the result
    /// is deterministic. Paths with an aggregate cost at or above INF are
    /// never installed.
    fn recompute_paths(&mut self) -> Result<(), DeviceError> {
        let mut dist: HashMap<NodeIndex, Cost> = HashMap::new();
        let mut first_hop: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<(Cost, Address, NodeIndex)>> = BinaryHeap::new();

        dist.insert(self.self_idx, 0);
        heap.push(Reverse((0, self.addr.clone(), self.self_idx)));

        while let Some(Reverse((cost, _, node))) = heap.pop() {
            if dist.get(&node).map_or(true, |&best| cost > best) {
                continue;
            }
            for edge in self.graph.edges(node) {
                let next = edge.target();
                let next_cost = cost.saturating_add(*edge.weight());
                if next_cost >= INF {
                    continue;
                }
                if dist.get(&next).map_or(true, |&best| next_cost < best) {
                    dist.insert(next, next_cost);
                    let hop = if node == self.self_idx {
                        next
                    } else {
                        // every settled node other than the source was
                        // relaxed through some edge before, so it has a hop
                        *first_hop.get(&node).unwrap()
                    };
                    first_hop.insert(next, hop);
                    heap.push(Reverse((next_cost, self.graph[next].addr.clone(), next)));
                }
            }
        }

        let mut fwd_table = BTreeMap::new();
        for (node, hop) in first_hop {
            let hop_info = &self.graph[hop];
            let port = hop_info
                .port
                .ok_or_else(|| DeviceError::NoPortBinding(hop_info.addr.clone()))?;
            fwd_table.insert(self.graph[node].addr.clone(), port);
        }
        self.fwd_table = fwd_table;
        Ok(())
    }
}
