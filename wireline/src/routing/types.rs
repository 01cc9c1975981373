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

//! Module containing all type definitions of the routing core.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a network node. Addresses are opaque strings; their ordering
/// (lexicographic) is used wherever the protocols need a deterministic
/// tie-break.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create a new address from anything string-like.
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Borrow the address as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Number of a local link endpoint. One port is bound to at most one live
/// neighbor at any time.
pub type Port = u16;

/// Link or path cost.
pub type Cost = u32;

/// The cost treated as "unreachable". No path with an aggregate cost at or
/// above this value is ever installed, and a distance-vector entry missing
/// from an advertisement is read as this value.
pub const INF: Cost = 16;

/// Router Errors. All of these indicate a violated protocol invariant on the
/// side of the caller (the simulation host), and are treated as fatal in
/// tests.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeviceError {
    /// A packet or link event referenced a port with no live neighbor
    #[error("Port {0} is not bound to any live neighbor")]
    PortNotConnected(Port),
    /// A routing packet arrived on a port bound to a different neighbor
    #[error("Routing packet on port {port} claims origin {found}, but the port is bound to {expected}")]
    UnexpectedOrigin {
        /// Arrival port of the offending packet
        port: Port,
        /// Address the port is bound to
        expected: Address,
        /// Origin claimed by the packet
        found: Address,
    },
    /// The routing payload could not be decoded for this protocol
    #[error("Cannot decode routing payload: {0}")]
    MalformedPayload(String),
    /// A first hop or flooding target has no local port recorded
    #[error("Neighbor {0} has no local port bound")]
    NoPortBinding(Address),
}

/// Network Errors, raised by the simulation host driving the routers.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NetworkError {
    /// Device Error which cannot be handled
    #[error("Device Error: {0}")]
    DeviceError(#[from] DeviceError),
    /// Device is not present in the topology
    #[error("Network device was not found in topology: {0}")]
    DeviceNotFound(Address),
    /// A device with the same address already exists
    #[error("Network device already exists in topology: {0}")]
    DuplicateDevice(Address),
    /// Two routers are not adjacent
    #[error("Network link does not exist: {0} -> {1}")]
    LinkMissing(Address, Address),
    /// Forwarding loop detected
    #[error("Forwarding Loop occurred! path: {0:?}")]
    ForwardingLoop(Vec<Address>),
    /// Black hole detected
    #[error("Black hole occurred! path: {0:?}")]
    ForwardingBlackHole(Vec<Address>),
    /// Convergence Problem
    #[error("Network cannot converge in the given time!")]
    NoConvergence,
}
