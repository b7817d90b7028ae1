use std::collections::HashMap;
use std::net::IpAddr;

use log::warn;

use crate::error::Result;
use crate::prefix::PrefixKey;

/// Source of currently established TCP connections.
pub trait ConnectionProbe {
    /// Remote addresses of established TCP/IPv4 connections.
    fn tcp4(&self) -> Result<Vec<IpAddr>>;
    /// Remote addresses of established TCP/IPv6 connections.
    fn tcp6(&self) -> Result<Vec<IpAddr>>;
}

/// Established connections bucketed by remote prefix, rebuilt every cycle.
#[derive(Debug, Default, Clone)]
pub struct ActiveConnections {
    counts: HashMap<PrefixKey, usize>,
}

impl ActiveConnections {
    /// A failing family is logged and contributes nothing.
    pub fn collect(probe: &dyn ConnectionProbe) -> Self {
        let mut active = ActiveConnections::default();
        for (family, result) in [("tcp", probe.tcp4()), ("tcp6", probe.tcp6())] {
            match result {
                Ok(remotes) => active.extend(remotes),
                Err(e) => warn!("netstat error ({}): {}", family, e),
            }
        }
        active
    }

    pub fn extend<I: IntoIterator<Item = IpAddr>>(&mut self, remotes: I) {
        for ip in remotes {
            *self.counts.entry(PrefixKey::from_ip(ip)).or_insert(0) += 1;
        }
    }

    pub fn count(&self, key: &PrefixKey) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }
}

/// Reads the kernel socket tables under `/proc/net`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcNetProbe;

#[cfg(target_os = "linux")]
mod proc_net {
    use std::net::IpAddr;

    use procfs::net::{TcpNetEntry, TcpState};

    use crate::error::{Error, Result};

    pub fn established(entries: procfs::ProcResult<Vec<TcpNetEntry>>) -> Result<Vec<IpAddr>> {
        let entries = entries.map_err(|e| Error::Probe(e.to_string()))?;
        Ok(entries
            .into_iter()
            .filter(|e| e.state == TcpState::Established)
            .map(|e| e.remote_address.ip())
            .collect())
    }
}

#[cfg(target_os = "linux")]
impl ConnectionProbe for ProcNetProbe {
    fn tcp4(&self) -> Result<Vec<IpAddr>> {
        proc_net::established(procfs::net::tcp())
    }

    fn tcp6(&self) -> Result<Vec<IpAddr>> {
        proc_net::established(procfs::net::tcp6())
    }
}

#[cfg(not(target_os = "linux"))]
impl ConnectionProbe for ProcNetProbe {
    fn tcp4(&self) -> Result<Vec<IpAddr>> {
        Err(crate::error::Error::Probe("not supported on this platform".into()))
    }

    fn tcp6(&self) -> Result<Vec<IpAddr>> {
        Err(crate::error::Error::Probe("not supported on this platform".into()))
    }
}
