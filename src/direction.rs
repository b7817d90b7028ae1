use crate::identity::LocalIdentity;
use crate::packet::{LinkFlow, NetworkFlow};

/// Direction of a packet relative to the monitored interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
    Unknown,
}

impl Direction {
    pub fn is_outbound(self) -> bool {
        self == Direction::Outbound
    }
}

/// Link-layer comparison wins when both sides have a MAC; the local IP set
/// is the fallback for captures without link framing.
pub fn classify(
    identity: &LocalIdentity,
    link: Option<&LinkFlow>,
    network: Option<&NetworkFlow>,
) -> Direction {
    if let (Some(mac), Some(link)) = (identity.mac, link) {
        return if link.src == mac {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
    }
    if !identity.ips.is_empty()
        && let Some(network) = network
    {
        return if identity.is_local_ip(&network.src) {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
    }
    Direction::Unknown
}

/// Which side of the traffic gets reported; fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportDirection {
    #[default]
    Outbound,
    Inbound,
}

impl ReportDirection {
    /// `Unknown` counts as not outbound, so it is reported in inbound mode.
    pub fn accepts(self, direction: Direction) -> bool {
        match self {
            ReportDirection::Outbound => direction.is_outbound(),
            ReportDirection::Inbound => !direction.is_outbound(),
        }
    }

    /// The remote end of a flow seen in this direction.
    pub fn remote<A: Copy>(self, src: A, dst: A) -> A {
        match self {
            ReportDirection::Outbound => dst,
            ReportDirection::Inbound => src,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Flow;
    use pnet::datalink::MacAddr;
    use std::net::IpAddr;

    const LOCAL: MacAddr = MacAddr(2, 0, 0, 0, 0, 1);
    const OTHER: MacAddr = MacAddr(2, 0, 0, 0, 0, 2);

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn net(src: &str, dst: &str) -> NetworkFlow {
        Flow::new(ip(src), ip(dst))
    }

    #[test]
    fn mac_match_is_outbound_regardless_of_ips() {
        let id = LocalIdentity::new(Some(LOCAL), vec![ip("10.0.0.5")]);
        let link = Flow::new(LOCAL, OTHER);
        let n = net("192.0.2.1", "10.0.0.5");
        assert_eq!(classify(&id, Some(&link), Some(&n)), Direction::Outbound);
    }

    #[test]
    fn mac_mismatch_is_inbound_even_from_local_ip() {
        let id = LocalIdentity::new(Some(LOCAL), vec![ip("10.0.0.5")]);
        let link = Flow::new(OTHER, LOCAL);
        let n = net("10.0.0.5", "8.8.8.8");
        assert_eq!(classify(&id, Some(&link), Some(&n)), Direction::Inbound);
    }

    #[test]
    fn ip_fallback_without_mac() {
        let id = LocalIdentity::new(None, vec![ip("10.0.0.5")]);
        let link = Flow::new(OTHER, LOCAL);
        assert_eq!(
            classify(&id, Some(&link), Some(&net("10.0.0.5", "8.8.8.8"))),
            Direction::Outbound
        );
        assert_eq!(
            classify(&id, None, Some(&net("8.8.8.8", "10.0.0.5"))),
            Direction::Inbound
        );
    }

    #[test]
    fn ip_fallback_without_link_flow() {
        let id = LocalIdentity::new(Some(LOCAL), vec![ip("10.0.0.5")]);
        assert_eq!(
            classify(&id, None, Some(&net("10.0.0.5", "1.1.1.1"))),
            Direction::Outbound
        );
    }

    #[test]
    fn nothing_to_compare_is_unknown() {
        let id = LocalIdentity::default();
        assert_eq!(
            classify(&id, None, Some(&net("10.0.0.5", "1.1.1.1"))),
            Direction::Unknown
        );
        let id = LocalIdentity::new(None, vec![ip("10.0.0.5")]);
        assert_eq!(classify(&id, None, None), Direction::Unknown);
    }

    #[test]
    fn report_direction_filters_and_picks_remote() {
        assert!(ReportDirection::Outbound.accepts(Direction::Outbound));
        assert!(!ReportDirection::Outbound.accepts(Direction::Unknown));
        assert!(ReportDirection::Inbound.accepts(Direction::Inbound));
        assert!(ReportDirection::Inbound.accepts(Direction::Unknown));
        assert!(!ReportDirection::Inbound.accepts(Direction::Outbound));

        assert_eq!(ReportDirection::Outbound.remote("src", "dst"), "dst");
        assert_eq!(ReportDirection::Inbound.remote("src", "dst"), "src");
    }
}
