use std::{
    io::{Read, Write},
    path::Path,
};

use log::info;
use mac_address::MacAddress;
use pcap_file::{PcapReader, PcapWriter};

use crate::{
    capture::{self, StreamError},
    error::{Error, Result},
    matcher::LinkLayer,
};

pub const BROADCAST: [u8; 6] = [0xff; 6];
const ETHERNET_HEADER_LEN: usize = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub packets: usize,
    pub rewritten: usize,
}

/// Copies `input` to `output`, pointing every non-broadcast Ethernet frame
/// at `destination`.
pub fn rewrite_destination(
    input: &Path,
    output: &Path,
    destination: MacAddress,
) -> Result<RewriteStats> {
    let reader = capture::open_reader(input)?;
    match capture::link_layer(reader.header.datalink) {
        Ok(LinkLayer::Ethernet) => {}
        _ => {
            return Err(Error::Configuration(format!(
                "{} has link type {:?}, destination rewriting needs ethernet frames",
                input.display(),
                reader.header.datalink
            )))
        }
    }
    let mut writer = capture::create_writer(output, reader.header.clone())?;

    info!("rewriting destination of {} to {}", input.display(), destination);
    let stats = match rewrite_packets(reader, &mut writer, destination.bytes()) {
        Ok(stats) => stats,
        Err(e) => {
            capture::discard(writer, output);
            return Err(e.into_error(input, output));
        }
    };
    capture::finish(writer, output)?;

    info!(
        "rewrote {} of {} frames into {}",
        stats.rewritten,
        stats.packets,
        output.display()
    );
    Ok(stats)
}

pub(crate) fn rewrite_packets<R: Read, W: Write>(
    reader: PcapReader<R>,
    writer: &mut PcapWriter<W>,
    destination: [u8; 6],
) -> std::result::Result<RewriteStats, StreamError> {
    let mut stats = RewriteStats::default();

    for packet in reader {
        let packet = packet.map_err(StreamError::Read)?;
        stats.packets += 1;

        let mut data = packet.data.into_owned();
        if data.len() >= ETHERNET_HEADER_LEN && data[..6] != BROADCAST {
            data[..6].copy_from_slice(&destination);
            stats.rewritten += 1;
        }

        let header = packet.header;
        writer
            .write(header.ts_sec, header.ts_nsec, &data, header.orig_len)
            .map_err(StreamError::Write)?;
    }

    Ok(stats)
}
