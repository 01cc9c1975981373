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

//! Module defining the packets exchanged between routers, and the wire
//! encoding of routing payloads.

use crate::routing::types::{Address, Cost, DeviceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distinguishes data-plane traffic from control-plane traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Application traffic (including traceroute probes). Forwarded per the
    /// forwarding table, never inspected.
    Data,
    /// Protocol traffic. The content is a [`RoutingPayload`] produced by a
    /// router of the same protocol.
    Routing,
}

/// A packet traveling through the simulated network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Data-plane or control-plane
    pub kind: PacketKind,
    /// Address of the node which created the packet
    pub src: Address,
    /// Address of the node the packet is destined to
    pub dst: Address,
    /// Opaque content. For routing packets, the encoded [`RoutingPayload`].
    pub content: String,
}

impl Packet {
    /// Create a data-plane packet carrying an opaque application payload.
    pub fn data<S: Into<String>>(src: Address, dst: Address, content: S) -> Self {
        Self { kind: PacketKind::Data, src, dst, content: content.into() }
    }

    /// Create a routing packet carrying the encoded payload.
    pub fn routing(src: Address, dst: Address, payload: &RoutingPayload) -> Self {
        Self { kind: PacketKind::Routing, src, dst, content: payload.encode() }
    }

    /// Returns true if and only if this is a routing packet.
    pub fn is_routing(&self) -> bool {
        self.kind == PacketKind::Routing
    }
}

/// The payload of a routing packet. Each protocol produces and consumes only
/// its own variant; receiving the wrong variant is a decode error.
///
/// The serialized form is untagged, so a distance-vector update carries
/// exactly the two fields `addr` and `dv`, and a link-state advertisement
/// carries exactly `source_addr`, `packet_id` and `ls_neighbors`. The two
/// variants have disjoint field names and decode unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutingPayload {
    /// A full distance vector, as advertised by a direct neighbor.
    DvUpdate {
        /// Address of the advertising router
        addr: Address,
        /// The advertised distance vector. Entries the advertiser routes
        /// through the receiver are omitted (poisoned reverse); a missing
        /// entry is read as [`INF`](crate::routing::INF).
        dv: BTreeMap<Address, Cost>,
    },
    /// A versioned announcement of one router's direct links.
    LsAdvertisement {
        /// Address of the originating router
        source_addr: Address,
        /// Sequence number, strictly increasing per origin
        packet_id: u64,
        /// Direct links of the origin. A cost of [`INF`](crate::routing::INF)
        /// announces the removal of that edge.
        ls_neighbors: Vec<(Address, Cost)>,
    },
}

impl RoutingPayload {
    /// Encode the payload for transmission.
    pub fn encode(&self) -> String {
        // serialization of string-keyed maps and tuples cannot fail
        serde_json::to_string(self).expect("routing payloads always serialize")
    }

    /// Decode a payload received from a peer of the same implementation.
    pub fn decode(content: &str) -> Result<Self, DeviceError> {
        serde_json::from_str(content).map_err(|e| DeviceError::MalformedPayload(e.to_string()))
    }
}
