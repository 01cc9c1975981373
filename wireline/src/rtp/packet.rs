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

//! Module defining the transport packet format.
//!
//! Every packet starts with a 16-byte header of four big-endian `u32`
//! fields: `(type, seq_num, length, checksum)`. The checksum is CRC-32 over
//! header and payload with the checksum field zeroed. There are no options
//! and no extensions; `length` is the payload byte count and is zero for
//! everything but DATA.

/// Size of the fixed packet header in bytes.
pub const HEADER_LEN: usize = 16;

/// Largest payload carried by a single DATA packet.
pub const PAYLOAD_MAX_BYTES: usize = 1440;

const TYPE_START: u32 = 0;
const TYPE_END: u32 = 1;
const TYPE_DATA: u32 = 2;
const TYPE_ACK: u32 = 3;

/// A decoded transport packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtpPacket {
    /// Opens a stream. Always carries sequence number 0 and no payload.
    Start {
        /// Sequence number (0 by protocol)
        seq: u32,
    },
    /// Closes a stream. Sent once all data is acknowledged.
    End {
        /// Sequence number, one past the last DATA
        seq: u32,
    },
    /// One fragment of the byte stream.
    Data {
        /// Sequence number
        seq: u32,
        /// Stream fragment, at most [`PAYLOAD_MAX_BYTES`] bytes
        payload: Vec<u8>,
    },
    /// Acknowledges exactly the packet with the carried sequence number.
    Ack {
        /// Sequence number being acknowledged
        seq: u32,
    },
}

impl RtpPacket {
    /// The sequence number carried in the header.
    pub fn seq(&self) -> u32 {
        match self {
            Self::Start { seq } | Self::End { seq } | Self::Ack { seq } => *seq,
            Self::Data { seq, .. } => *seq,
        }
    }

    fn wire_type(&self) -> u32 {
        match self {
            Self::Start { .. } => TYPE_START,
            Self::End { .. } => TYPE_END,
            Self::Data { .. } => TYPE_DATA,
            Self::Ack { .. } => TYPE_ACK,
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            Self::Data { payload, .. } => payload,
            _ => &[],
        }
    }

    /// Encode the packet into a datagram: header with a zeroed checksum
    /// field, then the payload, then the checksum patched in.
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(&self.wire_type().to_be_bytes());
        buf.extend_from_slice(&self.seq().to_be_bytes());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(payload);
        let checksum = checksum(&buf);
        buf[12..HEADER_LEN].copy_from_slice(&checksum.to_be_bytes());
        buf
    }

    /// Decode a received datagram. Returns `None` if the datagram is
    /// corrupted: shorter than a header, a declared length reaching past the
    /// datagram, a checksum mismatch, or an unknown type field.
    pub fn decode(datagram: &[u8]) -> Option<RtpPacket> {
        if datagram.len() < HEADER_LEN {
            return None;
        }
        let wire_type = read_u32(datagram, 0);
        let seq = read_u32(datagram, 4);
        let length = read_u32(datagram, 8) as usize;
        let stored = read_u32(datagram, 12);
        if HEADER_LEN + length > datagram.len() {
            return None;
        }
        // the checksum covers header and payload with its own field zeroed
        let mut scratch = datagram[..HEADER_LEN + length].to_vec();
        scratch[12..HEADER_LEN].fill(0);
        if checksum(&scratch) != stored {
            return None;
        }
        match wire_type {
            TYPE_START => Some(Self::Start { seq }),
            TYPE_END => Some(Self::End { seq }),
            TYPE_DATA => {
                Some(Self::Data { seq, payload: datagram[HEADER_LEN..HEADER_LEN + length].to_vec() })
            }
            TYPE_ACK => Some(Self::Ack { seq }),
            _ => None,
        }
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
