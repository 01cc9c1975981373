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

#![deny(missing_docs, missing_debug_implementations)]

//! # Wireline
//!
//! Two independent networking cores sharing nothing but this crate:
//!
//! - **[`routing`]**: per-router forwarding-table computation, driven by
//!   link events and routing packets. The same event interface is
//!   implemented twice, as a distance-vector protocol
//!   ([`DvRouter`](routing::DvRouter)) and as a link-state protocol
//!   ([`LsRouter`](routing::LsRouter)). A small simulation host
//!   ([`Network`](routing::Network)) serializes the event callbacks and
//!   carries the messages, mainly for tests and experiments.
//!
//! - **[`rtp`]**: a reliable, ordered byte stream over unreliable UDP
//!   datagrams. The [`RtpSender`](rtp::RtpSender) fragments its input under
//!   a bounded sliding window and retransmits on timeout; the
//!   [`RtpReceiver`](rtp::RtpReceiver) reassembles, acknowledges every
//!   delivered packet, and emits the stream strictly in order. Framing is a
//!   fixed 16-byte header protected by a CRC-32 checksum.
//!
//! The routing core depends only on a message-send primitive and a
//! millisecond clock tick; the transport core depends only on a datagram
//! socket and a monotonic clock. Neither depends on the other.

pub mod routing;
pub mod rtp;

mod error;
pub use error::Error;

// test modules
mod test;
