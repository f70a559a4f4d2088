use std::{io, path::PathBuf};

use pcap_file::{DataLink, PcapError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure aborts the current run; the variants only say which side of
/// the run (input, configuration, output) broke.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ReadError,
    },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("unable to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: WriteError,
    },
}

impl Error {
    pub(crate) fn read(path: impl Into<PathBuf>, source: impl Into<ReadError>) -> Self {
        Self::Read {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<WriteError>) -> Self {
        Self::Write {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed capture: {0}")]
    Pcap(#[from] PcapError),
    #[error("document has no root element")]
    NoRootElement,
    #[error("document ends inside <{0}>")]
    UnclosedElement(String),
    #[error("element <{0}> follows the root element")]
    TrailingElement(String),
    #[error("flow #{flow} has no <{field}> element")]
    MissingField { flow: usize, field: &'static str },
    #[error("flow #{flow} has an invalid <{field}> value {value:?}")]
    InvalidField {
        flow: usize,
        field: &'static str,
        value: String,
    },
    #[error("unsupported link type {0:?}")]
    UnsupportedLinkType(DataLink),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("xml serialisation failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("capture serialisation failed: {0}")]
    Pcap(#[from] PcapError),
}
