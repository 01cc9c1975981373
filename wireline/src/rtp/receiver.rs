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

//! Module defining the receiving side of the reliable transport.

use crate::rtp::packet::RtpPacket;
use crate::rtp::socket::{Received, RtpSocket};
use log::*;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs};

/// A buffered out-of-order packet. Ordered by sequence number alone, so the
/// heap pops the lowest outstanding sequence first.
#[derive(Debug)]
struct BufferedPacket {
    seq: u32,
    packet: RtpPacket,
}

impl PartialEq for BufferedPacket {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for BufferedPacket {}

impl Ord for BufferedPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

impl PartialOrd for BufferedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Window-bounded reassembly buffer: a min-heap keyed by sequence number
/// with admission control. A packet is admitted only if its sequence number
/// lies below `next_seq + window_size` and is not already buffered; this
/// keeps the buffer within the window and stops a smaller sequence number
/// from evicting an already-acknowledged larger one.
#[derive(Debug)]
pub(crate) struct ReorderBuffer {
    window_size: usize,
    next_seq: u32,
    heap: BinaryHeap<Reverse<BufferedPacket>>,
}

impl ReorderBuffer {
    pub(crate) fn new(window_size: usize, next_seq: u32) -> Self {
        Self { window_size, next_seq, heap: BinaryHeap::new() }
    }

    /// The next sequence number expected in order.
    pub(crate) fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Mark the next expected packet as delivered.
    pub(crate) fn advance(&mut self) {
        self.next_seq += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    fn contains(&self, seq: u32) -> bool {
        self.heap.iter().any(|Reverse(buffered)| buffered.seq == seq)
    }

    /// Admit a packet into the buffer, ignoring duplicates and anything
    /// beyond the window.
    pub(crate) fn admit(&mut self, packet: RtpPacket) {
        let seq = packet.seq();
        if seq as u64 >= self.next_seq as u64 + self.window_size as u64 {
            debug!("seq {} is beyond the window (next {}), dropping", seq, self.next_seq);
            return;
        }
        if self.contains(seq) {
            return;
        }
        self.heap.push(Reverse(BufferedPacket { seq, packet }));
    }

    /// Pop the lowest buffered packet if it is ready, meaning its sequence
    /// number does not exceed the next expected one.
    pub(crate) fn pop_ready(&mut self) -> Option<RtpPacket> {
        if self.heap.peek().map_or(false, |Reverse(buffered)| buffered.seq <= self.next_seq) {
            self.heap.pop().map(|Reverse(buffered)| buffered.packet)
        } else {
            None
        }
    }
}

/// The receiving half of a one-way reliable stream.
///
/// Created with [`accept`](Self::accept), which blocks until a sender
/// completes the START handshake; [`pipe`](Self::pipe) then writes the
/// stream to the given writer in strict sequence order, exactly once per
/// payload, and returns when the END packet is delivered.
#[derive(Debug)]
pub struct RtpReceiver {
    socket: RtpSocket,
    /// The sender, learned from the handshake
    peer: SocketAddr,
    buffer: ReorderBuffer,
}

impl RtpReceiver {
    /// Bind to `listen` and block until a sender opens a stream. Corrupt
    /// datagrams and packets other than START are dropped until the
    /// handshake arrives; the handshake acknowledgement carries the START's
    /// own sequence number.
    pub fn accept<A: ToSocketAddrs>(listen: A, window_size: usize) -> io::Result<Self> {
        if window_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "window size must be at least 1",
            ));
        }
        let mut socket = RtpSocket::bind(listen)?;
        loop {
            match socket.recv()? {
                Received::Packet(RtpPacket::Start { seq }, from) => {
                    debug_assert_eq!(seq, 0);
                    socket.send(&RtpPacket::Ack { seq }, from)?;
                    info!("accepted stream from {}", from);
                    return Ok(Self {
                        socket,
                        peer: from,
                        buffer: ReorderBuffer::new(window_size, seq + 1),
                    });
                }
                Received::Packet(other, from) => {
                    debug!("ignoring {:?} from {} before handshake", other, from);
                }
                Received::Corrupt | Received::Timeout => {}
            }
        }
    }

    /// Receive the stream, writing every DATA payload to `out` in sequence
    /// order, flushing after each write. Every delivered packet is
    /// acknowledged with its own sequence number, duplicates included.
    /// Returns when the END packet is delivered in order.
    pub fn pipe<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        loop {
            match self.socket.recv()? {
                Received::Corrupt | Received::Timeout => continue,
                Received::Packet(RtpPacket::Ack { seq }, _) => {
                    debug!("ignoring stray ack {}", seq);
                }
                Received::Packet(packet, _) => {
                    self.buffer.admit(packet);
                    while let Some(ready) = self.buffer.pop_ready() {
                        let seq = ready.seq();
                        self.socket.send(&RtpPacket::Ack { seq }, self.peer)?;
                        if seq == self.buffer.next_seq() {
                            self.buffer.advance();
                            if let RtpPacket::Data { payload, .. } = &ready {
                                out.write_all(payload)?;
                                // a lost END would otherwise strand the tail
                                // of the stream in the writer's buffer
                                out.flush()?;
                            }
                        }
                        if let RtpPacket::End { .. } = ready {
                            debug_assert_eq!(self.buffer.len(), 0);
                            debug!("stream from {} finished", self.peer);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
