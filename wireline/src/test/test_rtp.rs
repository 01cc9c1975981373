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

use crate::rtp::packet::{RtpPacket, HEADER_LEN};
use crate::rtp::receiver::ReorderBuffer;

#[test]
fn packets_survive_an_encode_decode_round_trip() {
    let packets = vec![
        RtpPacket::Start { seq: 0 },
        RtpPacket::Ack { seq: 17 },
        RtpPacket::Data { seq: 3, payload: b"hello".to_vec() },
        RtpPacket::Data { seq: 4, payload: Vec::new() },
        RtpPacket::End { seq: 9 },
    ];
    for packet in packets {
        let datagram = packet.encode();
        assert_eq!(RtpPacket::decode(&datagram), Some(packet));
    }
}

#[test]
fn header_layout_is_big_endian() {
    let datagram = RtpPacket::Data { seq: 258, payload: b"x".to_vec() }.encode();
    assert_eq!(&datagram[0..4], &[0, 0, 0, 2]); // DATA
    assert_eq!(&datagram[4..8], &[0, 0, 1, 2]); // seq 258
    assert_eq!(&datagram[8..12], &[0, 0, 0, 1]); // one payload byte
    assert_eq!(datagram.len(), HEADER_LEN + 1);
}

#[test]
fn a_flipped_payload_bit_is_detected() {
    let mut datagram = RtpPacket::Data { seq: 1, payload: b"payload".to_vec() }.encode();
    datagram[HEADER_LEN] ^= 0x01;
    assert_eq!(RtpPacket::decode(&datagram), None);
}

#[test]
fn a_flipped_header_bit_is_detected() {
    let mut datagram = RtpPacket::Ack { seq: 1 }.encode();
    datagram[5] ^= 0x80;
    assert_eq!(RtpPacket::decode(&datagram), None);
}

#[test]
fn truncated_datagrams_are_corrupt() {
    let datagram = RtpPacket::Data { seq: 1, payload: b"payload".to_vec() }.encode();
    // shorter than a header
    assert_eq!(RtpPacket::decode(&datagram[..HEADER_LEN - 1]), None);
    // the declared length reaches past the datagram
    assert_eq!(RtpPacket::decode(&datagram[..datagram.len() - 2]), None);
}

#[test]
fn unknown_packet_types_are_corrupt() {
    let mut datagram = RtpPacket::Ack { seq: 1 }.encode();
    datagram[3] = 9;
    // fixing up the checksum does not help
    let mut scratch = datagram.clone();
    scratch[12..HEADER_LEN].fill(0);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&scratch);
    datagram[12..HEADER_LEN].copy_from_slice(&hasher.finalize().to_be_bytes());
    assert_eq!(RtpPacket::decode(&datagram), None);
}

#[test]
fn trailing_garbage_beyond_the_declared_length_is_ignored() {
    let mut datagram = RtpPacket::Data { seq: 2, payload: b"abc".to_vec() }.encode();
    datagram.extend_from_slice(b"zzzz");
    assert_eq!(
        RtpPacket::decode(&datagram),
        Some(RtpPacket::Data { seq: 2, payload: b"abc".to_vec() })
    );
}

fn data(seq: u32) -> RtpPacket {
    // a one-byte payload derived from the sequence number, so deliveries
    // can be checked for order
    RtpPacket::Data { seq, payload: vec![b'a' + (seq as u8) - 1] }
}

#[test]
fn buffer_admits_only_within_the_window() {
    let mut buffer = ReorderBuffer::new(2, 1);
    buffer.admit(data(3)); // beyond next + window
    assert_eq!(buffer.len(), 0);
    buffer.admit(data(2));
    assert_eq!(buffer.len(), 1);
    buffer.admit(data(2)); // duplicate
    assert_eq!(buffer.len(), 1);
    assert!(buffer.pop_ready().is_none()); // 2 is not ready while 1 is missing
    buffer.admit(data(1));
    assert_eq!(buffer.pop_ready(), Some(data(1)));
}

#[test]
fn exactly_once_delivery_under_duplication() {
    // six one-byte packets with a duplicate of seq 3 injected, window 2
    let mut buffer = ReorderBuffer::new(2, 1);
    let mut delivered = Vec::new();
    for seq in [1u32, 2, 3, 3, 4, 5, 6] {
        buffer.admit(data(seq));
        while let Some(ready) = buffer.pop_ready() {
            if ready.seq() == buffer.next_seq() {
                buffer.advance();
                if let RtpPacket::Data { payload, .. } = &ready {
                    delivered.extend_from_slice(payload);
                }
            }
        }
        assert!(buffer.len() <= 2);
    }
    assert_eq!(delivered, b"abcdef");
}

#[test]
fn out_of_order_arrival_is_reassembled() {
    let mut buffer = ReorderBuffer::new(4, 1);
    let mut delivered = Vec::new();
    for seq in [2u32, 4, 1, 3, 6, 5] {
        buffer.admit(data(seq));
        while let Some(ready) = buffer.pop_ready() {
            if ready.seq() == buffer.next_seq() {
                buffer.advance();
                if let RtpPacket::Data { payload, .. } = &ready {
                    delivered.extend_from_slice(payload);
                }
            }
        }
        assert!(buffer.len() <= 4);
    }
    assert_eq!(delivered, b"abcdef");
}

#[test]
fn late_duplicates_below_the_window_pop_immediately() {
    let mut buffer = ReorderBuffer::new(2, 1);
    buffer.admit(data(1));
    assert_eq!(buffer.pop_ready(), Some(data(1)));
    buffer.advance();

    // the acknowledgement for 1 was lost and the sender resent it; the
    // duplicate is admitted and pops right away, so it can be re-acked
    buffer.admit(data(1));
    assert_eq!(buffer.pop_ready(), Some(data(1)));
    assert_eq!(buffer.next_seq(), 2);
    assert_eq!(buffer.len(), 0);
}
