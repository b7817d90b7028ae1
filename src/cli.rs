use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use pnet::datalink::MacAddr;

fn parse_mac(s: &str) -> Result<MacAddr, String> {
    s.parse::<MacAddr>()
        .map_err(|e| format!("invalid MAC address {:?}: {:?}", s, e))
}

/// Live per-prefix bandwidth top: totals and rates per /24 (IPv4) or /48 (IPv6)
#[derive(Parser, Debug, Clone)]
#[command(name = "prefixtop")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Press 's' (lowercase) to change sort order, 'q' to quit")]
pub struct Args {
    /// Interface to listen on
    #[arg(short = 'i', long = "interface", env = "PREFIXTOP_INTERFACE", default_value = "eth0")]
    pub interface: String,

    /// Number of top values to show
    #[arg(long = "top", env = "PREFIXTOP_TOP", default_value = "10",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub top: u64,

    /// Do not detect active connections
    #[arg(long = "no-netstat")]
    pub no_netstat: bool,

    /// Show inbound traffic instead of outbound
    #[arg(long = "inbound")]
    pub inbound: bool,

    /// Sort by delta instead of total
    #[arg(long = "sort-delta")]
    pub sort_delta: bool,

    /// MaxMind City database file (empty for no geo lookups)
    #[arg(long = "geoip-db", env = "PREFIXTOP_GEOIP_DB", default_value = "")]
    pub geoip_db: String,

    /// Language for geo names, falling back to English
    #[arg(long = "geo-lang", env = "PREFIXTOP_GEO_LANG", default_value = "en")]
    pub geo_lang: String,

    /// BPF filter applied to the capture
    #[arg(short = 'f', long = "filter")]
    pub filter: Option<String>,

    /// Read packets from a pcap file instead of the live interface
    #[arg(short = 'r', long = "read")]
    pub read: Option<PathBuf>,

    /// Local MAC address to classify against instead of the interface's
    #[arg(long = "local-mac", value_parser = parse_mac)]
    pub local_mac: Option<MacAddr>,

    /// Local IP address to classify against instead of the interface's (repeatable)
    #[arg(long = "local-ip")]
    pub local_ip: Vec<IpAddr>,

    /// Exit after this many reports (0 = run forever)
    #[arg(short = 'c', long = "count", env = "PREFIXTOP_COUNT", default_value = "0")]
    pub count: u64,

    /// Print the time before each report
    #[arg(long = "timestamps")]
    pub timestamps: bool,

    /// Do not read single keystrokes from the terminal
    #[arg(long = "no-keys")]
    pub no_keys: bool,
}
