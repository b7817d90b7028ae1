use std::net::IpAddr;
use std::path::PathBuf;

use pnet::datalink::MacAddr;

use crate::cli::Args;
use crate::direction::ReportDirection;
use crate::sort_mode::SortMode;

/// Startup settings consumed by the monitor, independent of how they were
/// supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub interface: String,
    pub top: usize,
    pub direction: ReportDirection,
    pub netstat: bool,
    pub sort: SortMode,
    pub geo_db: Option<PathBuf>,
    pub geo_lang: String,
    pub filter: Option<String>,
    pub read_file: Option<PathBuf>,
    pub local_mac: Option<MacAddr>,
    pub local_ips: Vec<IpAddr>,
    pub count: u64,
    pub timestamps: bool,
    pub keys: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interface: "eth0".to_string(),
            top: 10,
            direction: ReportDirection::Outbound,
            netstat: true,
            sort: SortMode::ByTotal,
            geo_db: None,
            geo_lang: "en".to_string(),
            filter: None,
            read_file: None,
            local_mac: None,
            local_ips: Vec::new(),
            count: 0,
            timestamps: false,
            keys: true,
        }
    }
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Settings {
            interface: args.interface,
            top: usize::try_from(args.top).unwrap_or(usize::MAX),
            direction: if args.inbound {
                ReportDirection::Inbound
            } else {
                ReportDirection::Outbound
            },
            netstat: !args.no_netstat,
            sort: if args.sort_delta {
                SortMode::ByDelta
            } else {
                SortMode::ByTotal
            },
            geo_db: (!args.geoip_db.is_empty()).then(|| PathBuf::from(args.geoip_db)),
            geo_lang: args.geo_lang,
            filter: args.filter,
            read_file: args.read,
            local_mac: args.local_mac,
            local_ips: args.local_ip,
            count: args.count,
            timestamps: args.timestamps,
            keys: !args.no_keys,
        }
    }
}
