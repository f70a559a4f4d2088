use std::net::IpAddr;

use chrono::{DateTime, TimeZone, Utc};
use etherparse::{InternetSlice, SlicedPacket, TransportSlice};

use crate::flow::{Flow, IP_PROTO_TCP, IP_PROTO_UDP};

/// How the frames of a capture start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet,
    RawIp,
}

/// The parts of a packet a flow is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSummary {
    pub timestamp: DateTime<Utc>,
    pub source: IpAddr,
    pub destination: IpAddr,
    pub protocol: u8,
    /// (source, destination), only for TCP and UDP.
    pub ports: Option<(u16, u16)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Ip(PacketSummary),
    /// Decoded fine but carries no IP layer (ARP, LLDP, ...).
    NonIp,
    Undecodable,
}

impl PacketSummary {
    pub fn decode(link: LinkLayer, data: &[u8], timestamp: DateTime<Utc>) -> Decoded {
        let sliced = match link {
            LinkLayer::Ethernet => SlicedPacket::from_ethernet(data),
            LinkLayer::RawIp => SlicedPacket::from_ip(data),
        };
        let sliced = match sliced {
            Ok(sliced) => sliced,
            Err(_) => return Decoded::Undecodable,
        };

        let (protocol, source, destination) = match sliced.ip {
            Some(InternetSlice::Ipv4(hdr, _)) => (
                hdr.protocol(),
                IpAddr::from(hdr.source()),
                IpAddr::from(hdr.destination()),
            ),
            Some(InternetSlice::Ipv6(hdr, _)) => (
                hdr.next_header(),
                IpAddr::from(hdr.source()),
                IpAddr::from(hdr.destination()),
            ),
            None => return Decoded::NonIp,
        };

        // IPv6 extension headers hide the transport protocol behind
        // next_header, so trust the transport slice when there is one.
        let (protocol, ports) = match sliced.transport {
            Some(TransportSlice::Tcp(hdr)) => (
                IP_PROTO_TCP,
                Some((hdr.source_port(), hdr.destination_port())),
            ),
            Some(TransportSlice::Udp(hdr)) => (
                IP_PROTO_UDP,
                Some((hdr.source_port(), hdr.destination_port())),
            ),
            _ => (protocol, None),
        };

        Decoded::Ip(Self {
            timestamp,
            source,
            destination,
            protocol,
            ports,
        })
    }
}

/// Converts a capture record timestamp. `None` if it is out of chrono's range.
pub fn record_time(ts_sec: u32, ts_nsec: u32) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(i64::from(ts_sec), ts_nsec).single()
}

impl Flow {
    pub fn matches(&self, packet: &PacketSummary) -> bool {
        self.endpoints_match(packet)
            && self.protocol.ip_number() == Some(packet.protocol)
            && self.ports_match(packet)
            && self.contains(packet.timestamp)
    }

    #[inline]
    fn endpoints_match(&self, packet: &PacketSummary) -> bool {
        (packet.source == self.source && packet.destination == self.destination)
            || (packet.source == self.destination && packet.destination == self.source)
    }

    fn ports_match(&self, packet: &PacketSummary) -> bool {
        if !self.protocol.has_ports() {
            return true;
        }
        match (packet.ports, self.source_port, self.destination_port) {
            (Some((src, dst)), Some(flow_src), Some(flow_dst)) => {
                (src == flow_src && dst == flow_dst) || (src == flow_dst && dst == flow_src)
            }
            _ => false,
        }
    }

    /// Flow times have whole-second resolution, so the packet time is
    /// truncated before the inclusive comparison.
    #[inline]
    fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let secs = timestamp.timestamp();
        self.start.timestamp() <= secs && secs <= self.stop.timestamp()
    }
}

/// Every loaded flow, scanned linearly per packet. The filter is an offline
/// batch job, so O(packets x flows) is accepted.
#[derive(Debug, Clone, Default)]
pub struct FlowTable {
    flows: Vec<Flow>,
}

impl FlowTable {
    pub fn new(flows: Vec<Flow>) -> Self {
        Self { flows }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Index of the first flow the packet belongs to.
    pub fn find(&self, packet: &PacketSummary) -> Option<usize> {
        self.flows.iter().position(|flow| flow.matches(packet))
    }
}
