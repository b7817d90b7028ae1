//! Header-only decoding of captured frames into link and network flows.
//!
//! Only the headers are parsed, so a short capture snaplen is enough and
//! truncated payloads never cause a packet to be dropped.

use std::net::IpAddr;

use etherparse::{Ethernet2HeaderSlice, Ipv4HeaderSlice, Ipv6HeaderSlice, SingleVlanHeaderSlice};
use pnet::datalink::MacAddr;

/// Added to the length declared in the IP header to approximate the
/// link-layer and header bytes that field does not cover. This is not an
/// exact wire count for any particular framing.
pub const FRAME_OVERHEAD: u64 = 40;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;
const ETHERTYPE_PPPOE_SESSION: u16 = 0x8864;

// PPPoE session header (6) + PPP protocol field (2)
const PPPOE_HEADER_LEN: usize = 8;
const SLL_HEADER_LEN: usize = 16;
const NULL_HEADER_LEN: usize = 4;

/// A (source, destination) pair at one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flow<A> {
    pub src: A,
    pub dst: A,
}

impl<A> Flow<A> {
    pub fn new(src: A, dst: A) -> Self {
        Flow { src, dst }
    }
}

pub type LinkFlow = Flow<MacAddr>;
pub type NetworkFlow = Flow<IpAddr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkLayer {
    pub flow: NetworkFlow,
    /// IPv4 total length or IPv6 payload length, as declared in the header.
    pub declared_len: u16,
}

impl NetworkLayer {
    pub fn accounted_len(&self) -> u64 {
        u64::from(self.declared_len) + FRAME_OVERHEAD
    }
}

/// A decoded packet as seen by the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub link: Option<LinkFlow>,
    pub network: Option<NetworkLayer>,
}

/// Link-layer framing of a capture, derived from its pcap link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Ethernet,
    LinuxSll,
    Null,
    RawIp,
}

impl Framing {
    pub fn decode(self, data: &[u8]) -> Option<Packet> {
        match self {
            Framing::Ethernet => decode_ethernet(data),
            Framing::LinuxSll => {
                let proto = u16::from_be_bytes([*data.get(14)?, *data.get(15)?]);
                let network = match proto {
                    ETHERTYPE_IPV4 | ETHERTYPE_IPV6 => network_layer(&data[SLL_HEADER_LEN..]),
                    _ => None,
                };
                Some(Packet { link: None, network })
            }
            Framing::Null => Some(Packet {
                link: None,
                network: network_layer(data.get(NULL_HEADER_LEN..)?),
            }),
            Framing::RawIp => Some(Packet {
                link: None,
                network: network_layer(data),
            }),
        }
    }
}

fn decode_ethernet(data: &[u8]) -> Option<Packet> {
    let eth = Ethernet2HeaderSlice::from_slice(data).ok()?;
    let link = Flow::new(mac(eth.source()), mac(eth.destination()));

    let mut ether_type = eth.ether_type();
    let mut rest = &data[eth.slice().len()..];

    // at most two tags (802.1ad outer, 802.1Q inner)
    for _ in 0..2 {
        if ether_type != ETHERTYPE_VLAN && ether_type != ETHERTYPE_QINQ {
            break;
        }
        let Ok(vlan) = SingleVlanHeaderSlice::from_slice(rest) else {
            return Some(Packet { link: Some(link), network: None });
        };
        ether_type = vlan.ether_type();
        rest = &rest[vlan.slice().len()..];
    }

    let network = match ether_type {
        ETHERTYPE_IPV4 | ETHERTYPE_IPV6 => network_layer(rest),
        ETHERTYPE_PPPOE_SESSION if rest.len() > PPPOE_HEADER_LEN => {
            network_layer(&rest[PPPOE_HEADER_LEN..])
        }
        _ => None,
    };

    Some(Packet {
        link: Some(link),
        network,
    })
}

/// Parses an IPv4 or IPv6 header, picked by the version nibble.
fn network_layer(data: &[u8]) -> Option<NetworkLayer> {
    match data.first()? >> 4 {
        4 => {
            let ip = Ipv4HeaderSlice::from_slice(data).ok()?;
            Some(NetworkLayer {
                flow: Flow::new(IpAddr::V4(ip.source_addr()), IpAddr::V4(ip.destination_addr())),
                declared_len: ip.total_len(),
            })
        }
        6 => {
            let ip = Ipv6HeaderSlice::from_slice(data).ok()?;
            Some(NetworkLayer {
                flow: Flow::new(IpAddr::V6(ip.source_addr()), IpAddr::V6(ip.destination_addr())),
                declared_len: ip.payload_length(),
            })
        }
        _ => None,
    }
}

fn mac(b: [u8; 6]) -> MacAddr {
    MacAddr::new(b[0], b[1], b[2], b[3], b[4], b[5])
}
