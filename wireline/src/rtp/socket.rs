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

//! Module wrapping the UDP socket used by both transport endpoints.

use crate::rtp::packet::RtpPacket;
use log::*;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// Size of the receive buffer. Larger than any frame the protocol emits.
const RECV_BUFFER_SIZE: usize = 2048;

/// Outcome of one blocking read on the socket. Timeouts and corruption are
/// ordinary values here, not errors: the endpoint state machines branch on
/// them.
#[derive(Debug)]
pub enum Received {
    /// The read timed out before any datagram arrived.
    Timeout,
    /// A datagram arrived but did not decode to a valid packet.
    Corrupt,
    /// A valid packet, and the address it came from.
    Packet(RtpPacket, SocketAddr),
}

/// A blocking UDP socket speaking the transport framing.
#[derive(Debug)]
pub struct RtpSocket {
    socket: UdpSocket,
    // Always-allocated receive buffer
    recv_buffer: Box<[u8]>,
}

impl RtpSocket {
    /// Bind to a specific local address (receiver side).
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self { socket, recv_buffer: vec![0; RECV_BUFFER_SIZE].into_boxed_slice() })
    }

    /// Bind to an ephemeral local port (sender side).
    pub fn bind_ephemeral() -> io::Result<Self> {
        Self::bind(("0.0.0.0", 0))
    }

    /// Set the read timeout for [`recv`](Self::recv). `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    /// The local address this socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Encode and transmit one packet.
    pub fn send(&self, packet: &RtpPacket, to: SocketAddr) -> io::Result<()> {
        self.socket.send_to(&packet.encode(), to)?;
        Ok(())
    }

    /// Block for one datagram, up to the configured read timeout.
    pub fn recv(&mut self) -> io::Result<Received> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((len, from)) => match RtpPacket::decode(&self.recv_buffer[..len]) {
                Some(packet) => Ok(Received::Packet(packet, from)),
                None => {
                    debug!("dropping corrupt datagram of {} bytes from {}", len, from);
                    Ok(Received::Corrupt)
                }
            },
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(Received::Timeout)
            }
            Err(e) => Err(e),
        }
    }
}
