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

//! Module defining a router running the distance-vector protocol.

use crate::routing::event::SendQueue;
use crate::routing::packet::{Packet, PacketKind, RoutingPayload};
use crate::routing::types::{Address, Cost, DeviceError, Port, INF};
use crate::routing::Router;
use log::*;
use std::collections::BTreeMap;

/// State kept per direct neighbor. Created on link-up, destroyed on
/// link-down. The cached distance vector is the only state used to recompute
/// routes when bad news invalidates paths through this neighbor.
#[derive(Debug, Clone)]
struct Neighbor {
    /// Address of the neighbor
    addr: Address,
    /// Local port the link is attached to
    port: Port,
    /// Cost of the direct link
    cost: Cost,
    /// Most recent distance vector reported by the neighbor
    dv: BTreeMap<Address, Cost>,
}

/// Distance-vector router.
///
/// The router maintains its own distance vector and forwarding table by
/// relaxing the cached vectors of its direct neighbors, and advertises the
/// result with poisoned reverse: entries routed through a neighbor are left
/// out of the advertisement sent to that neighbor, and a missing entry is
/// read as unreachable by the receiver.
#[derive(Debug)]
pub struct DvRouter {
    /// Own address
    addr: Address,
    /// Interval between periodic broadcasts
    heartbeat_ms: u64,
    /// Time of the last periodic broadcast. Event-driven broadcasts do not
    /// reset this.
    last_heartbeat: u64,
    /// Own distance vector. The own address is always present at cost 0; no
    /// entry ever reaches INF.
    pub(crate) dv: BTreeMap<Address, Cost>,
    /// Destination to outgoing port, for every destination in `dv` except
    /// the own address
    pub(crate) fwd_table: BTreeMap<Address, Port>,
    /// Live neighbors, keyed by local port
    neighbors: BTreeMap<Port, Neighbor>,
}

impl Router for DvRouter {
    fn new(addr: Address, heartbeat_ms: u64) -> Self {
        let mut dv = BTreeMap::new();
        dv.insert(addr.clone(), 0);
        Self {
            addr,
            heartbeat_ms,
            last_heartbeat: 0,
            dv,
            fwd_table: BTreeMap::new(),
            neighbors: BTreeMap::new(),
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
        let mut initial_dv = BTreeMap::new();
        initial_dv.insert(addr.clone(), 0);
        let neighbor = Neighbor { addr, port, cost, dv: initial_dv };
        let improved = Self::relax(&mut self.dv, &mut self.fwd_table, &neighbor);
        self.neighbors.insert(port, neighbor);
        if improved {
            self.broadcast(out);
        }
        Ok(())
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

        let (origin, new_dv) = match RoutingPayload::decode(&packet.content)? {
            RoutingPayload::DvUpdate { addr, dv } => (addr, dv),
            RoutingPayload::LsAdvertisement { .. } => {
                return Err(DeviceError::MalformedPayload(
                    "expected a distance-vector update".to_string(),
                ))
            }
        };

        let bad_news = {
            let neighbor =
                self.neighbors.get_mut(&port).ok_or(DeviceError::PortNotConnected(port))?;
            if neighbor.addr != origin {
                return Err(DeviceError::UnexpectedOrigin {
                    port,
                    expected: neighbor.addr.clone(),
                    found: origin,
                });
            }
            let old_dv = std::mem::replace(&mut neighbor.dv, new_dv);
            Self::is_bad_news(&old_dv, &neighbor.dv)
        };

        if bad_news {
            // A route through this neighbor got more expensive or vanished.
            // Routes relying on it must be recomputed from scratch, or the
            // relaxation inequality would keep the stale entries alive.
            debug!("{}: bad news from port {}, recomputing", self.addr, port);
            self.wipe_port(port);
            self.broadcast(out);
        } else if let Some(neighbor) = self.neighbors.get(&port) {
            if Self::relax(&mut self.dv, &mut self.fwd_table, neighbor) {
                self.broadcast(out);
            }
        }
        Ok(())
    }

    fn handle_remove_link(&mut self, port: Port, out: &mut SendQueue) -> Result<(), DeviceError> {
        if self.neighbors.remove(&port).is_none() {
            return Err(DeviceError::PortNotConnected(port));
        }
        debug!("{}: link on port {} removed", self.addr, port);
        self.wipe_port(port);
        self.broadcast(out);
        Ok(())
    }

    fn handle_time(&mut self, now_ms: u64, out: &mut SendQueue) -> Result<(), DeviceError> {
        if now_ms >= self.last_heartbeat + self.heartbeat_ms {
            self.last_heartbeat = now_ms;
            self.broadcast(out);
        }
        Ok(())
    }

    fn next_port(&self, dst: &Address) -> Option<Port> {
        self.fwd_table.get(dst).copied()
    }

    fn debug_string(&self) -> String {
        serde_json::json!({ "dv": &self.dv, "fwd": &self.fwd_table }).to_string()
    }
}

impl DvRouter {
    /// Send the current distance vector to every neighbor, with poisoned
    /// reverse: entries forwarded through a neighbor are omitted from the
    /// copy sent to that neighbor. The trimmed view is built while encoding,
    /// the own vector is never copied or modified.
    fn broadcast(&self, out: &mut SendQueue) {
        for neighbor in self.neighbors.values() {
            let dv: BTreeMap<Address, Cost> = self
                .dv
                .iter()
                .filter(|(addr, _)| self.fwd_table.get(*addr) != Some(&neighbor.port))
                .map(|(addr, &cost)| (addr.clone(), cost))
                .collect();
            let payload = RoutingPayload::DvUpdate { addr: self.addr.clone(), dv };
            let packet = Packet::routing(self.addr.clone(), neighbor.addr.clone(), &payload);
            out.push_back((neighbor.port, packet));
        }
    }

    /// Relax the own distance vector against one neighbor's cached vector.
    /// Installs every strictly better path, then prunes entries whose cost
    /// reached INF from both the vector and the forwarding table. Returns
    /// whether anything improved.
    fn relax(
        dv: &mut BTreeMap<Address, Cost>,
        fwd_table: &mut BTreeMap<Address, Port>,
        neighbor: &Neighbor,
    ) -> bool {
        let mut updated = false;
        for (addr, &cost) in neighbor.dv.iter() {
            let proposed = cost.saturating_add(neighbor.cost);
            let current = dv.get(addr).copied().unwrap_or(INF);
            if proposed >= current {
                continue;
            }
            dv.insert(addr.clone(), proposed);
            fwd_table.insert(addr.clone(), neighbor.port);
            updated = true;
        }
        let unreachable: Vec<Address> =
            dv.iter().filter(|(_, &cost)| cost >= INF).map(|(addr, _)| addr.clone()).collect();
        for addr in unreachable {
            dv.remove(&addr);
            fwd_table.remove(&addr);
        }
        updated
    }

    /// Returns whether an updated distance vector reports a cost increase or
    /// a dropped destination, compared to the previous vector from the same
    /// neighbor. Good news alone never triggers a recomputation.
    fn is_bad_news(prev_dv: &BTreeMap<Address, Cost>, new_dv: &BTreeMap<Address, Cost>) -> bool {
        prev_dv.iter().any(|(addr, &cost)| match new_dv.get(addr) {
            None => true,
            Some(&new_cost) => new_cost > cost,
        })
    }

    /// Remove all routes leaving through `port`, then rebuild from the
    /// cached vectors of the remaining neighbors.
    fn wipe_port(&mut self, port: Port) {
        let wiped: Vec<Address> = self
            .fwd_table
            .iter()
            .filter(|(_, &fwd_port)| fwd_port == port)
            .map(|(addr, _)| addr.clone())
            .collect();
        for addr in wiped {
            self.fwd_table.remove(&addr);
            self.dv.remove(&addr);
        }
        for neighbor in self.neighbors.values() {
            Self::relax(&mut self.dv, &mut self.fwd_table, neighbor);
        }
    }
}
