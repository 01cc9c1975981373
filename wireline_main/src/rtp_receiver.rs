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
use wireline::rtp::RtpReceiver;

/// Accept one stream and write it to standard output in order.
#[derive(Parser, Debug)]
#[command(name = "wireline-rtp-receiver")]
struct Args {
    /// UDP port to listen on
    listen_port: u16,
    /// Maximum number of out-of-order packets to buffer
    window_size: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let args = Args::parse();

    info!("listening on port {}", args.listen_port);
    let mut receiver = RtpReceiver::accept(("0.0.0.0", args.listen_port), args.window_size)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    receiver.pipe(&mut out)?;
    Ok(())
}
