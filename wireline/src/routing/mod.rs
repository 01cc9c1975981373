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

//! # Routing core
//!
//! Per-router forwarding-table computation in response to link events and
//! routing updates, implemented twice over the same event interface:
//!
//! - [`DvRouter`]: distance-vector routing with split horizon and poisoned
//!   reverse to suppress count-to-infinity.
//! - [`LsRouter`]: link-state routing with controlled flooding of versioned
//!   advertisements and local shortest-path recomputation.
//!
//! Routers are passive automata: an external event loop (in tests and
//! examples, the [`Network`] host) serializes the four event callbacks of
//! the [`Router`] trait and transmits whatever the router pushes onto its
//! [`SendQueue`]. Routers never block and hold no reference to the
//! transport.
//!
//! ## Example
//!
//! ```rust
//! use wireline::routing::{DvRouter, Network, NetworkError};
//!
//! fn main() -> Result<(), NetworkError> {
//!     let mut net: Network<DvRouter> = Network::new(1000);
//!     net.add_router("A")?;
//!     net.add_router("B")?;
//!     net.add_router("C")?;
//!     net.add_link("A", "B", 1)?;
//!     net.add_link("B", "C", 1)?;
//!
//!     let route = net.get_route("A", "C")?;
//!     assert_eq!(route.len(), 3);
//!     Ok(())
//! }
//! ```

pub mod dv;
pub(crate) mod event;
pub mod ls;
pub(crate) mod network;
pub mod packet;
pub(crate) mod types;

pub use dv::DvRouter;
pub use event::SendQueue;
pub use ls::LsRouter;
pub use network::Network;
pub use packet::{Packet, PacketKind, RoutingPayload};
pub use types::{Address, Cost, DeviceError, NetworkError, Port, INF};

/// The event interface every router implements, as seen from the simulation
/// host. The host serializes all calls; a callback returns before the next
/// event is delivered, and must not block. Outbound packets are pushed onto
/// the borrowed [`SendQueue`] as `(port, packet)` pairs.
pub trait Router {
    /// Create a router with the given address and heartbeat interval. The
    /// initial state knows only the own address; there are no neighbors.
    fn new(addr: Address, heartbeat_ms: u64) -> Self
    where
        Self: Sized;

    /// The address of this router.
    fn address(&self) -> &Address;

    /// A new link to `addr` with the given cost was attached to `port`.
    fn handle_new_link(
        &mut self,
        port: Port,
        addr: Address,
        cost: Cost,
        out: &mut SendQueue,
    ) -> Result<(), DeviceError>;

    /// A packet arrived on `port`. Data packets are forwarded per the
    /// forwarding table (or dropped); routing packets drive the protocol.
    fn handle_packet(
        &mut self,
        port: Port,
        packet: Packet,
        out: &mut SendQueue,
    ) -> Result<(), DeviceError>;

    /// The link on `port` went down.
    fn handle_remove_link(&mut self, port: Port, out: &mut SendQueue) -> Result<(), DeviceError>;

    /// Periodic tick with the current monotonic time. Heartbeat broadcasts
    /// fire from here.
    fn handle_time(&mut self, now_ms: u64, out: &mut SendQueue) -> Result<(), DeviceError>;

    /// Current forwarding-table entry for a destination, if any.
    fn next_port(&self, dst: &Address) -> Option<Port>;

    /// A printable snapshot of the router state for inspection. The format
    /// carries no semantic guarantees.
    fn debug_string(&self) -> String;
}
