use std::net::IpAddr;

use log::{info, warn};
use pnet::datalink::{self, MacAddr, NetworkInterface};

use crate::error::{Error, Result};

/// Addresses that identify the monitored host on one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalIdentity {
    pub mac: Option<MacAddr>,
    pub ips: Vec<IpAddr>,
}

impl LocalIdentity {
    pub fn new(mac: Option<MacAddr>, ips: Vec<IpAddr>) -> Self {
        LocalIdentity { mac, ips }
    }

    /// Looks up `name` among the host interfaces.
    pub fn resolve(name: &str) -> Result<Self> {
        Self::resolve_from(name, &datalink::interfaces())
    }

    pub fn resolve_from(name: &str, interfaces: &[NetworkInterface]) -> Result<Self> {
        let iface = interfaces
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;
        Ok(Self::from_interface(iface))
    }

    pub fn from_interface(iface: &NetworkInterface) -> Self {
        // loopback and tunnels report a zero MAC; frames on them carry none
        let mac = iface.mac.filter(|m| *m != MacAddr::zero());

        if iface.ips.is_empty() {
            warn!("Interface {} has no addresses", iface.name);
        }
        let ips = iface.ips.iter().map(|net| net.ip()).collect();

        LocalIdentity { mac, ips }
    }

    /// Addresses given on the command line, if any. A replayed capture may
    /// come from another host, so these take precedence over the interface.
    pub fn from_overrides(mac: Option<MacAddr>, ips: &[IpAddr]) -> Option<Self> {
        if mac.is_none() && ips.is_empty() {
            return None;
        }
        Some(LocalIdentity {
            mac,
            ips: ips.iter().map(|ip| ip.to_canonical()).collect(),
        })
    }

    /// Nothing to classify against: every packet is `Unknown`.
    pub fn is_empty(&self) -> bool {
        self.mac.is_none() && self.ips.is_empty()
    }

    pub fn is_local_ip(&self, ip: &IpAddr) -> bool {
        self.ips.contains(ip)
    }

    pub fn log(&self) {
        if let Some(mac) = self.mac {
            info!("MAC: {}", mac);
        }
        for ip in &self.ips {
            info!("IP: {}", ip);
        }
    }
}
