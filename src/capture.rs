use std::path::Path;

use log::{info, trace};
use pcap::{Activated, Capture, Linktype};

use crate::error::{Error, Result};
use crate::packet::{Framing, Packet};

/// Headers of Ethernet + IPv6 fit; payload bytes are never inspected.
pub const SNAPLEN: i32 = 72;
pub const READ_TIMEOUT_MS: i32 = 1000;

/// Producer of decoded packets. `Ok(None)` means the source is exhausted.
pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<Packet>>;
}

impl<I> PacketSource for I
where
    I: Iterator<Item = Packet>,
{
    fn next_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.next())
    }
}

pub struct PcapSource {
    cap: Capture<dyn Activated>,
    framing: Framing,
}

impl PcapSource {
    pub fn open_live(device: &str, filter: Option<&str>) -> Result<Self> {
        let cap = Capture::from_device(device)?
            .promisc(false)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .open()?;
        Self::from_capture(cap.into(), filter)
    }

    pub fn open_file<P: AsRef<Path>>(path: P, filter: Option<&str>) -> Result<Self> {
        let cap = Capture::from_file(path)?;
        Self::from_capture(cap.into(), filter)
    }

    fn from_capture(mut cap: Capture<dyn Activated>, filter: Option<&str>) -> Result<Self> {
        if let Some(filter) = filter {
            cap.filter(filter, true)?;
        }
        let linktype = cap.get_datalink();
        let name = linktype.get_name().unwrap_or_else(|_| "unknown".to_string());
        info!("Handle link type: {} ({})", name, linktype.0);

        let framing = framing_for(linktype).ok_or(Error::UnsupportedLinkType(name))?;
        Ok(PcapSource { cap, framing })
    }
}

impl PacketSource for PcapSource {
    fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            match self.cap.next_packet() {
                Ok(raw) => match self.framing.decode(raw.data) {
                    Some(packet) => return Ok(Some(packet)),
                    None => trace!("undecodable frame, {} bytes", raw.data.len()),
                },
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// DLT/LINKTYPE values as returned by libpcap.
pub fn framing_for(linktype: Linktype) -> Option<Framing> {
    match linktype.0 {
        1 => Some(Framing::Ethernet),
        0 | 108 => Some(Framing::Null),
        12 | 14 | 101 | 228 | 229 => Some(Framing::RawIp),
        113 => Some(Framing::LinuxSll),
        _ => None,
    }
}
