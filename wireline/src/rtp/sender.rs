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

//! Module defining the sending side of the reliable transport.

use crate::rtp::packet::{RtpPacket, PAYLOAD_MAX_BYTES};
use crate::rtp::socket::{Received, RtpSocket};
use crate::rtp::RETRANSMIT_TIMEOUT;
use log::*;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

/// A packet sent but not yet acknowledged. Lives from the moment the
/// payload first leaves the send queue until the matching acknowledgement
/// arrives.
#[derive(Debug)]
struct InFlightPacket {
    /// The full DATA packet, kept for retransmission
    packet: RtpPacket,
    /// When the packet was last transmitted (monotonic)
    sent_at: Instant,
}

/// The sending half of a one-way reliable stream.
///
/// Usage is `connect`, any number of `send` calls, then `close`. At most
/// `window_size` packets are ever in flight; sequence numbers are strictly
/// monotonic; a payload leaves the in-flight set only when its own
/// acknowledgement arrives, and is never sent again after that.
#[derive(Debug)]
pub struct RtpSender {
    /// Maximum number of unacknowledged packets
    window_size: usize,
    /// The receiver endpoint
    receiver: SocketAddr,
    socket: RtpSocket,
    /// Sequence number of the next packet to send
    curr_seq: u32,
    /// Payload chunks not yet transmitted
    send_queue: VecDeque<Vec<u8>>,
    /// Transmitted but unacknowledged packets, keyed by sequence number
    in_flight: HashMap<u32, InFlightPacket>,
}

impl RtpSender {
    /// Create a sender talking to `receiver`. Binds an ephemeral local port
    /// and configures the read timeout that drives retransmission.
    pub fn new(window_size: usize, receiver: SocketAddr) -> io::Result<Self> {
        if window_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "window size must be at least 1",
            ));
        }
        let socket = RtpSocket::bind_ephemeral()?;
        socket.set_read_timeout(Some(RETRANSMIT_TIMEOUT))?;
        Ok(Self {
            window_size,
            receiver,
            socket,
            curr_seq: 0,
            send_queue: VecDeque::new(),
            in_flight: HashMap::new(),
        })
    }

    /// Perform the START handshake. Blocks until the receiver acknowledges;
    /// the START is resent after every timeout, corrupt reply, or reply of
    /// an unexpected type.
    pub fn connect(&mut self) -> io::Result<()> {
        debug_assert_eq!(self.curr_seq, 0);
        loop {
            self.socket.send(&RtpPacket::Start { seq: self.curr_seq }, self.receiver)?;
            match self.socket.recv()? {
                Received::Packet(RtpPacket::Ack { seq }, _) => {
                    debug!("connected to {} (handshake ack {})", self.receiver, seq);
                    self.curr_seq = 1;
                    return Ok(());
                }
                Received::Packet(other, _) => {
                    debug!("ignoring {:?} while connecting", other);
                }
                Received::Corrupt | Received::Timeout => {}
            }
        }
    }

    /// Queue a payload for transmission and drive the window until
    /// everything queued so far has been sent and acknowledged.
    pub fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        for chunk in payload.chunks(PAYLOAD_MAX_BYTES) {
            self.send_queue.push_back(chunk.to_vec());
        }
        self.drive_window()
    }

    /// Close the stream: send END with a fresh sequence number and wait for
    /// its acknowledgement, giving up cleanly after one read timeout.
    pub fn close(mut self) -> io::Result<()> {
        self.drive_window()?;
        let end_seq = self.curr_seq;
        self.socket.send(&RtpPacket::End { seq: end_seq }, self.receiver)?;
        loop {
            match self.socket.recv()? {
                Received::Timeout => {
                    // the acknowledgement is lost or the receiver is gone;
                    // nothing left to wait for
                    warn!("no acknowledgement for END, closing anyway");
                    break;
                }
                Received::Packet(RtpPacket::Ack { seq }, _) if seq == end_seq => {
                    debug!("stream closed cleanly");
                    break;
                }
                Received::Packet(_, _) | Received::Corrupt => {}
            }
        }
        Ok(())
    }

    /// Keep the window full until both the send queue and the in-flight set
    /// are empty: refill, wait for one acknowledgement, and on a timeout
    /// retransmit everything that has been in flight for longer than the
    /// retransmission timeout.
    fn drive_window(&mut self) -> io::Result<()> {
        while !self.send_queue.is_empty() || !self.in_flight.is_empty() {
            while self.in_flight.len() < self.window_size {
                let payload = match self.send_queue.pop_front() {
                    Some(payload) => payload,
                    None => break,
                };
                let seq = self.curr_seq;
                let packet = RtpPacket::Data { seq, payload };
                self.socket.send(&packet, self.receiver)?;
                self.in_flight.insert(seq, InFlightPacket { packet, sent_at: Instant::now() });
                self.curr_seq += 1;
            }

            match self.socket.recv()? {
                Received::Timeout => {
                    for (seq, entry) in self.in_flight.iter_mut() {
                        if entry.sent_at.elapsed() > RETRANSMIT_TIMEOUT {
                            trace!("retransmitting seq {}", seq);
                            self.socket.send(&entry.packet, self.receiver)?;
                            entry.sent_at = Instant::now();
                        }
                    }
                }
                Received::Corrupt => {}
                Received::Packet(RtpPacket::Ack { seq }, _) => {
                    if self.in_flight.remove(&seq).is_some() {
                        trace!("seq {} acknowledged", seq);
                    }
                }
                Received::Packet(other, _) => {
                    debug!("ignoring {:?} while awaiting acknowledgements", other);
                }
            }
        }
        Ok(())
    }
}
