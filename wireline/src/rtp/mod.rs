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

//! # Reliable transport core
//!
//! An ordered, loss-tolerant, one-way byte stream over UDP. The
//! [`RtpSender`] connects with a START handshake, fragments its input into
//! packets of at most [`PAYLOAD_MAX_BYTES`](packet::PAYLOAD_MAX_BYTES)
//! bytes, keeps at most `window_size` packets in flight, and retransmits
//! whatever stays unacknowledged for longer than [`RETRANSMIT_TIMEOUT`].
//! The [`RtpReceiver`] buffers out-of-order packets in a window-bounded
//! min-heap, acknowledges every packet it delivers (and re-acknowledges
//! duplicates, in case the first acknowledgement was lost), and hands
//! payloads to its writer strictly in sequence order.
//!
//! Acknowledgements are per-packet on both sides: an ACK carries the
//! sequence number of exactly the packet it acknowledges.
//!
//! Both endpoints are single-threaded and blocking; the only timer is the
//! socket read timeout, measured against the monotonic clock.

pub mod packet;
pub mod receiver;
pub mod sender;
pub mod socket;

pub use packet::RtpPacket;
pub use receiver::RtpReceiver;
pub use sender::RtpSender;

use std::time::Duration;

/// How long a packet may stay unacknowledged before it is retransmitted.
/// Also the socket read timeout of the sender, so the retransmission scan
/// runs even when no acknowledgements arrive at all.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(500);
