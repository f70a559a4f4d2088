use std::{fmt, net::IpAddr, path::Path, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};

use crate::{
    error::{Error, ReadError, Result},
    loader::read_flow_file,
    record::{
        FlowRecord, DESTINATION, DESTINATION_PORT, PROTOCOL_NAME, SOURCE, SOURCE_PORT,
        START_DATE_TIME, STOP_DATE_TIME,
    },
};

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const IP_PROTO_ICMP: u8 = 1;
pub const IP_PROTO_IGMP: u8 = 2;
pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Igmp,
    Other(String),
}

impl Protocol {
    pub fn from_name(name: &str) -> Self {
        match name {
            "tcp_ip" => Protocol::Tcp,
            "udp_ip" => Protocol::Udp,
            "icmp_ip" => Protocol::Icmp,
            "igmp" => Protocol::Igmp,
            other => Protocol::Other(other.to_owned()),
        }
    }

    /// IP protocol number, `None` for names outside the fixed mapping.
    pub fn ip_number(&self) -> Option<u8> {
        match self {
            Protocol::Tcp => Some(IP_PROTO_TCP),
            Protocol::Udp => Some(IP_PROTO_UDP),
            Protocol::Icmp => Some(IP_PROTO_ICMP),
            Protocol::Igmp => Some(IP_PROTO_IGMP),
            Protocol::Other(_) => None,
        }
    }

    #[inline]
    pub fn has_ports(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp_ip"),
            Protocol::Udp => f.write_str("udp_ip"),
            Protocol::Icmp => f.write_str("icmp_ip"),
            Protocol::Igmp => f.write_str("igmp"),
            Protocol::Other(name) => f.write_str(name),
        }
    }
}

/// Typed view of a flow record, only the fields the capture filter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub protocol: Protocol,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl Flow {
    /// `position` is the 1-based index of the flow in its file, for error
    /// messages. Flow times are wall-clock strings read in `offset`.
    pub fn from_record(
        record: &FlowRecord,
        position: usize,
        offset: FixedOffset,
    ) -> std::result::Result<Self, ReadError> {
        let required = |field: &'static str| {
            record.get(field).ok_or(ReadError::MissingField {
                flow: position,
                field,
            })
        };
        let invalid = |field: &'static str, value: &str| ReadError::InvalidField {
            flow: position,
            field,
            value: value.to_owned(),
        };

        let address = |field: &'static str| -> std::result::Result<IpAddr, ReadError> {
            let value = required(field)?;
            IpAddr::from_str(value.trim()).map_err(|_| invalid(field, value))
        };
        let port = |field: &'static str| -> std::result::Result<Option<u16>, ReadError> {
            match record.get(field).map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => value.parse().map(Some).map_err(|_| invalid(field, value)),
            }
        };
        let time = |field: &'static str| -> std::result::Result<DateTime<Utc>, ReadError> {
            let value = required(field)?;
            let naive = NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT)
                .map_err(|_| invalid(field, value))?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|time| time.with_timezone(&Utc))
                .ok_or_else(|| invalid(field, value))
        };

        Ok(Self {
            source: address(SOURCE)?,
            destination: address(DESTINATION)?,
            protocol: Protocol::from_name(required(PROTOCOL_NAME)?.trim()),
            source_port: port(SOURCE_PORT)?,
            destination_port: port(DESTINATION_PORT)?,
            start: time(START_DATE_TIME)?,
            stop: time(STOP_DATE_TIME)?,
        })
    }
}

/// Reads `files` (relative to `dir`) in order and types every flow, so a bad
/// field is reported against the file it came from.
pub fn load_flows<S: AsRef<Path>>(
    dir: &Path,
    files: &[S],
    offset: FixedOffset,
) -> Result<Vec<Flow>> {
    let mut flows = Vec::new();
    for file in files {
        let path = dir.join(file);
        info!("reading flows from {}", path.display());
        let records = read_flow_file(&path)?;
        for (i, record) in records.iter().enumerate() {
            let flow =
                Flow::from_record(record, i + 1, offset).map_err(|e| Error::read(&path, e))?;
            debug!(
                "flow #{}: {} <-> {} over {}",
                i + 1,
                flow.source,
                flow.destination,
                flow.protocol
            );
            flows.push(flow);
        }
        info!("loaded {} flows from {}", records.len(), path.display());
    }
    Ok(flows)
}

/// Parses `+HH:MM`, `-HH:MM` or `Z` into an offset east of UTC.
pub fn parse_utc_offset(value: &str) -> std::result::Result<FixedOffset, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_owned());
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(format!("offset {value:?} must start with '+' or '-'")),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| format!("offset {value:?} must look like +HH:MM"))?;
    let hours: i32 = hours
        .parse()
        .map_err(|_| format!("invalid hours in offset {value:?}"))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("invalid minutes in offset {value:?}"))?;
    if minutes >= 60 {
        return Err(format!("invalid minutes in offset {value:?}"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset {value:?} is out of range"))
}
