use std::{
    io::{Read, Write},
    path::Path,
};

use log::{debug, info, warn};
use pcap_file::{PcapReader, PcapWriter};

use crate::{
    capture::{self, StreamError},
    error::{Error, Result},
    matcher::{record_time, Decoded, FlowTable, LinkLayer, PacketSummary},
};

const PROGRESS_EVERY: usize = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub packets: usize,
    pub matched: usize,
    pub non_ip: usize,
    pub undecodable: usize,
}

/// Copies every packet of `input` that belongs to a flow of `table` into a
/// new capture at `output`, byte for byte and in input order.
pub fn filter_capture(input: &Path, output: &Path, table: &FlowTable) -> Result<FilterStats> {
    let reader = capture::open_reader(input)?;
    let link = capture::link_layer(reader.header.datalink).map_err(|e| Error::read(input, e))?;
    let mut writer = capture::create_writer(output, reader.header.clone())?;

    info!(
        "matching packets of {} against {} flows",
        input.display(),
        table.len()
    );
    let stats = match filter_packets(reader, &mut writer, link, table) {
        Ok(stats) => stats,
        Err(e) => {
            capture::discard(writer, output);
            return Err(e.into_error(input, output));
        }
    };
    capture::finish(writer, output)?;

    if stats.undecodable > 0 {
        warn!(
            "{} frames of {} could not be decoded and were skipped",
            stats.undecodable,
            input.display()
        );
    }
    info!(
        "wrote {} of {} packets to {} ({} non-ip)",
        stats.matched,
        stats.packets,
        output.display(),
        stats.non_ip
    );
    Ok(stats)
}

pub(crate) fn filter_packets<R: Read, W: Write>(
    reader: PcapReader<R>,
    writer: &mut PcapWriter<W>,
    link: LinkLayer,
    table: &FlowTable,
) -> std::result::Result<FilterStats, StreamError> {
    let mut stats = FilterStats::default();

    for packet in reader {
        let packet = packet.map_err(StreamError::Read)?;
        stats.packets += 1;
        if stats.packets % PROGRESS_EVERY == 0 {
            debug!("scanned {} packets, {} matched", stats.packets, stats.matched);
        }

        let header = &packet.header;
        let timestamp = match record_time(header.ts_sec, header.ts_nsec) {
            Some(timestamp) => timestamp,
            None => {
                stats.undecodable += 1;
                continue;
            }
        };

        let summary = match PacketSummary::decode(link, &packet.data, timestamp) {
            Decoded::Ip(summary) => summary,
            Decoded::NonIp => {
                stats.non_ip += 1;
                continue;
            }
            Decoded::Undecodable => {
                stats.undecodable += 1;
                continue;
            }
        };

        if table.find(&summary).is_some() {
            writer
                .write(header.ts_sec, header.ts_nsec, &packet.data, header.orig_len)
                .map_err(StreamError::Write)?;
            stats.matched += 1;
        }
    }

    Ok(stats)
}
