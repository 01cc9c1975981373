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

//! Module defining the output side of the router event interface.

use crate::routing::packet::Packet;
use crate::routing::types::Port;
use std::collections::VecDeque;

/// Queue of outbound sends produced by a router callback. Each entry is a
/// `(port, packet)` pair: the packet is to leave the router through the given
/// local port. The router borrows the queue only for the duration of a single
/// callback; the host owns it and performs the actual transmission.
pub type SendQueue = VecDeque<(Port, Packet)>;
