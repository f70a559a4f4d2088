use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{info, warn};
use pcap_file::{pcap::PcapHeader, DataLink, PcapError, PcapReader, PcapWriter};

use crate::{
    error::{Error, ReadError, Result},
    matcher::LinkLayer,
};

pub type FileReader = PcapReader<io::BufReader<fs::File>>;
pub type FileWriter = PcapWriter<io::BufWriter<fs::File>>;

pub fn open_reader(path: &Path) -> Result<FileReader> {
    info!("opening capture {}", path.display());
    let file = fs::File::open(path).map_err(|e| Error::read(path, e))?;
    PcapReader::new(io::BufReader::new(file)).map_err(|e| Error::read(path, e))
}

/// Creates `path` with the given global header, so the output keeps the
/// input's link type, snap length and timestamp resolution.
pub fn create_writer(path: &Path, header: PcapHeader) -> Result<FileWriter> {
    info!("creating capture {}", path.display());
    let file = fs::File::create(path).map_err(|e| Error::write(path, e))?;
    PcapWriter::with_header(header, io::BufWriter::new(file)).map_err(|e| Error::write(path, e))
}

/// Flushes `writer`; a capture that cannot be flushed is removed.
pub fn finish(mut writer: FileWriter, path: &Path) -> Result<()> {
    if let Err(e) = writer.get_mut().flush() {
        discard(writer, path);
        return Err(Error::write(path, e));
    }
    Ok(())
}

/// Removes an output capture that could not be completed.
pub fn discard(writer: FileWriter, path: &Path) {
    drop(writer);
    if let Err(e) = fs::remove_file(path) {
        warn!("could not remove incomplete capture {}: {}", path.display(), e);
    }
}

pub fn link_layer(datalink: DataLink) -> std::result::Result<LinkLayer, ReadError> {
    match datalink {
        DataLink::ETHERNET => Ok(LinkLayer::Ethernet),
        DataLink::RAW | DataLink::IPV4 | DataLink::IPV6 => Ok(LinkLayer::RawIp),
        other => Err(ReadError::UnsupportedLinkType(other)),
    }
}

/// A failure while copying records from one capture stream to another.
#[derive(Debug)]
pub(crate) enum StreamError {
    Read(PcapError),
    Write(PcapError),
}

impl StreamError {
    pub(crate) fn into_error(self, input: &Path, output: &Path) -> Error {
        match self {
            StreamError::Read(e) => Error::read(PathBuf::from(input), e),
            StreamError::Write(e) => Error::write(PathBuf::from(output), e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use pcap_file::pcap::Packet;

    /// (ts_sec, ts_nsec, frame)
    pub(crate) type Record = (u32, u32, Vec<u8>);

    pub(crate) fn write_capture(path: &Path, datalink: DataLink, records: &[Record]) {
        let header = PcapHeader {
            datalink,
            ..PcapHeader::default()
        };
        let mut writer = create_writer(path, header).unwrap();
        for (sec, nsec, frame) in records {
            writer.write(*sec, *nsec, frame, frame.len() as u32).unwrap();
        }
        finish(writer, path).unwrap();
    }

    pub(crate) fn read_capture(path: &Path) -> (PcapHeader, Vec<Packet<'static>>) {
        let reader = open_reader(path).unwrap();
        let header = reader.header.clone();
        let packets = reader.map(|packet| packet.unwrap()).collect();
        (header, packets)
    }

    pub(crate) fn frames(packets: &[Packet<'_>]) -> Vec<Record> {
        packets
            .iter()
            .map(|p| (p.header.ts_sec, p.header.ts_nsec, p.data.to_vec()))
            .collect()
    }

    #[test]
    fn link_types() {
        assert_eq!(link_layer(DataLink::ETHERNET).unwrap(), LinkLayer::Ethernet);
        assert_eq!(link_layer(DataLink::RAW).unwrap(), LinkLayer::RawIp);
        assert!(matches!(
            link_layer(DataLink::NULL),
            Err(ReadError::UnsupportedLinkType(DataLink::NULL))
        ));
    }

    #[test]
    fn missing_capture_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pcap");
        match open_reader(&path) {
            Err(Error::Read { path: failed, .. }) => assert_eq!(failed, path),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("opened a missing capture"),
        }
    }

    #[test]
    fn garbage_is_not_a_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.pcap");
        fs::write(&path, b"this is not a capture file at all").unwrap();
        assert!(matches!(
            open_reader(&path),
            Err(Error::Read {
                source: ReadError::Pcap(_),
                ..
            })
        ));
    }
}
