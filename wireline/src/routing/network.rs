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

//! Module defining the simulation host driving a set of routers.

use crate::routing::event::SendQueue;
use crate::routing::packet::Packet;
use crate::routing::types::{Address, Cost, NetworkError, Port};
use crate::routing::Router;
use log::*;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Number of messages processed before assuming that the network cannot
/// converge.
const DEFAULT_STOP_AFTER: usize = 10_000;

/// The simulation host: a set of routers of one protocol, the links between
/// them, and the event loop delivering their messages.
///
/// The host serializes all callbacks: no two callbacks run concurrently on
/// the same router, and every topology operation drains the message queue to
/// quiescence before returning. Message delivery is lossless and ordered;
/// loss recovery is exercised by dropping messages addressed to removed
/// links.
#[derive(Debug)]
pub struct Network<R> {
    /// All routers, keyed (and iterated deterministically) by address
    routers: BTreeMap<Address, R>,
    /// Live links: both directions are present as `(from, port) -> (to,
    /// port)` entries
    links: HashMap<(Address, Port), (Address, Port)>,
    /// Next free port per router
    next_port: HashMap<Address, Port>,
    /// Pending deliveries `(to, arrival port, packet)`
    queue: VecDeque<(Address, Port, Packet)>,
    /// Current simulation time in milliseconds
    time_ms: u64,
    /// Heartbeat interval handed to every router
    heartbeat_ms: u64,
    /// Message budget per drain, to detect non-convergence
    stop_after: usize,
}

impl<R: Router> Network<R> {
    /// Generate an empty network whose routers broadcast every
    /// `heartbeat_ms` milliseconds.
    pub fn new(heartbeat_ms: u64) -> Self {
        Self {
            routers: BTreeMap::new(),
            links: HashMap::new(),
            next_port: HashMap::new(),
            queue: VecDeque::new(),
            time_ms: 0,
            heartbeat_ms,
            stop_after: DEFAULT_STOP_AFTER,
        }
    }

    /// Add a new router to the topology.
    pub fn add_router<S: Into<Address>>(&mut self, addr: S) -> Result<(), NetworkError> {
        let addr = addr.into();
        if self.routers.contains_key(&addr) {
            return Err(NetworkError::DuplicateDevice(addr));
        }
        self.routers.insert(addr.clone(), R::new(addr, self.heartbeat_ms));
        Ok(())
    }

    /// Connect two routers with a symmetric link of the given cost. A fresh
    /// port is allocated on both sides; the pair `(port at a, port at b)` is
    /// returned. The queue is drained before returning, so the network is
    /// quiescent afterwards.
    pub fn add_link<S: Into<Address>>(
        &mut self,
        a: S,
        b: S,
        cost: Cost,
    ) -> Result<(Port, Port), NetworkError> {
        let a = a.into();
        let b = b.into();
        let port_a = self.allocate_port(&a)?;
        let port_b = self.allocate_port(&b)?;
        self.links.insert((a.clone(), port_a), (b.clone(), port_b));
        self.links.insert((b.clone(), port_b), (a.clone(), port_a));
        info!("link up: {} (port {}) <-> {} (port {}), cost {}", a, port_a, b, port_b, cost);

        let mut out = SendQueue::new();
        self.router_mut(&a)?.handle_new_link(port_a, b.clone(), cost, &mut out)?;
        Self::route_sends(&self.links, &mut self.queue, &a, out);

        let mut out = SendQueue::new();
        self.router_mut(&b)?.handle_new_link(port_b, a.clone(), cost, &mut out)?;
        Self::route_sends(&self.links, &mut self.queue, &b, out);

        self.drain()?;
        Ok((port_a, port_b))
    }

    /// Tear down the link between two routers. The link is gone before
    /// either router is notified, so farewell messages sent through the
    /// dying link are lost, exactly as they would be on a dead wire.
    pub fn remove_link<S: Into<Address>>(&mut self, a: S, b: S) -> Result<(), NetworkError> {
        let a = a.into();
        let b = b.into();
        let (port_a, port_b) = self
            .links
            .iter()
            .find(|((from, _), (to, _))| *from == a && *to == b)
            .map(|((_, port_a), (_, port_b))| (*port_a, *port_b))
            .ok_or_else(|| NetworkError::LinkMissing(a.clone(), b.clone()))?;
        self.links.remove(&(a.clone(), port_a));
        self.links.remove(&(b.clone(), port_b));
        info!("link down: {} (port {}) <-> {} (port {})", a, port_a, b, port_b);

        let mut out = SendQueue::new();
        self.router_mut(&a)?.handle_remove_link(port_a, &mut out)?;
        Self::route_sends(&self.links, &mut self.queue, &a, out);

        let mut out = SendQueue::new();
        self.router_mut(&b)?.handle_remove_link(port_b, &mut out)?;
        Self::route_sends(&self.links, &mut self.queue, &b, out);

        self.drain()
    }

    /// Advance the simulation clock and deliver a time tick to every router,
    /// then drain the resulting messages. Heartbeats fire here.
    pub fn advance_time(&mut self, delta_ms: u64) -> Result<(), NetworkError> {
        self.time_ms += delta_ms;
        let now = self.time_ms;
        for (addr, router) in self.routers.iter_mut() {
            let mut out = SendQueue::new();
            router.handle_time(now, &mut out)?;
            Self::route_sends(&self.links, &mut self.queue, addr, out);
        }
        self.drain()
    }

    /// Follow the forwarding tables hop by hop from `source` towards
    /// `target`, returning the traversed path. Fails with
    /// [`NetworkError::ForwardingBlackHole`] if some router on the way has
    /// no route, and with [`NetworkError::ForwardingLoop`] if the walk
    /// revisits a router.
    pub fn get_route<S: Into<Address>>(
        &self,
        source: S,
        target: S,
    ) -> Result<Vec<Address>, NetworkError> {
        let target = target.into();
        let mut current = source.into();
        let mut path = vec![current.clone()];
        while current != target {
            let router = self
                .routers
                .get(&current)
                .ok_or_else(|| NetworkError::DeviceNotFound(current.clone()))?;
            let port = match router.next_port(&target) {
                Some(port) => port,
                None => return Err(NetworkError::ForwardingBlackHole(path)),
            };
            let (next, _) = self
                .links
                .get(&(current.clone(), port))
                .ok_or_else(|| NetworkError::LinkMissing(current.clone(), target.clone()))?;
            if path.contains(next) {
                path.push(next.clone());
                return Err(NetworkError::ForwardingLoop(path));
            }
            path.push(next.clone());
            current = next.clone();
        }
        Ok(path)
    }

    /// Current simulation time in milliseconds.
    pub fn time_ms(&self) -> u64 {
        self.time_ms
    }

    /// Borrow a router for inspection.
    pub fn get_router<S: Into<Address>>(&self, addr: S) -> Result<&R, NetworkError> {
        let addr = addr.into();
        self.routers.get(&addr).ok_or(NetworkError::DeviceNotFound(addr))
    }

    /// Replace the message budget used to detect non-convergence.
    pub fn set_msg_limit(&mut self, stop_after: usize) {
        self.stop_after = stop_after;
    }

    // -----------------
    // Private Functions
    // -----------------

    fn router_mut(&mut self, addr: &Address) -> Result<&mut R, NetworkError> {
        self.routers.get_mut(addr).ok_or_else(|| NetworkError::DeviceNotFound(addr.clone()))
    }

    fn allocate_port(&mut self, addr: &Address) -> Result<Port, NetworkError> {
        if !self.routers.contains_key(addr) {
            return Err(NetworkError::DeviceNotFound(addr.clone()));
        }
        let next = self.next_port.entry(addr.clone()).or_insert(1);
        let port = *next;
        *next += 1;
        Ok(port)
    }

    /// Map the sends of one router onto deliveries at its peers. Sends
    /// through a port with no live link are dropped, like frames on a dead
    /// wire.
    fn route_sends(
        links: &HashMap<(Address, Port), (Address, Port)>,
        queue: &mut VecDeque<(Address, Port, Packet)>,
        from: &Address,
        out: SendQueue,
    ) {
        for (port, packet) in out {
            match links.get(&(from.clone(), port)) {
                Some((to, to_port)) => queue.push_back((to.clone(), *to_port, packet)),
                None => debug!("{}: dropping packet sent through dead port {}", from, port),
            }
        }
    }

    /// Execute the queue until it is empty or the message budget runs out.
    fn drain(&mut self) -> Result<(), NetworkError> {
        let mut remaining = self.stop_after;
        while let Some((to, port, packet)) = self.queue.pop_front() {
            if remaining == 0 {
                return Err(NetworkError::NoConvergence);
            }
            remaining -= 1;
            let mut out = SendQueue::new();
            self.router_mut(&to)?.handle_packet(port, packet, &mut out)?;
            Self::route_sends(&self.links, &mut self.queue, &to, out);
        }
        Ok(())
    }
}
