use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub const IPV4_PREFIX_LEN: u8 = 24;
pub const IPV6_PREFIX_LEN: u8 = 48;

/// Aggregation bucket: a remote address masked to /24 (IPv4) or /48 (IPv6).
///
/// Ordering is by network address, then prefix length; the reporter uses it
/// to break ties between equal byte counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixKey {
    network: IpAddr,
    len: u8,
}

impl PrefixKey {
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip.to_canonical() {
            IpAddr::V4(v4) => {
                let mask = u32::MAX << (32 - IPV4_PREFIX_LEN);
                PrefixKey {
                    network: IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask)),
                    len: IPV4_PREFIX_LEN,
                }
            }
            IpAddr::V6(v6) => {
                let mask = u128::MAX << (128 - IPV6_PREFIX_LEN);
                PrefixKey {
                    network: IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask)),
                    len: IPV6_PREFIX_LEN,
                }
            }
        }
    }

    /// Network address of the prefix, used for geo lookups.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.len
    }
}

impl From<IpAddr> for PrefixKey {
    fn from(ip: IpAddr) -> Self {
        PrefixKey::from_ip(ip)
    }
}

impl fmt::Display for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}
