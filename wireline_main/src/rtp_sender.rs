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

use clap::Parser;
use log::*;
use std::error::Error;
use std::io::Read;
use std::net::SocketAddr;
use wireline::rtp::RtpSender;

/// Stream a message from standard input to a listening receiver.
#[derive(Parser, Debug)]
#[command(name = "wireline-rtp-sender")]
struct Args {
    /// IP address the receiver is listening on
    receiver_ip: String,
    /// UDP port the receiver is listening on
    receiver_port: u16,
    /// Maximum number of packets in flight
    window_size: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let args = Args::parse();

    let receiver: SocketAddr =
        format!("{}:{}", args.receiver_ip, args.receiver_port).parse()?;
    let mut message = Vec::new();
    std::io::stdin().read_to_end(&mut message)?;

    let mut sender = RtpSender::new(args.window_size, receiver)?;
    sender.connect()?;
    info!("connected to {}, streaming {} bytes", receiver, message.len());
    sender.send(&message)?;
    sender.close()?;
    Ok(())
}
