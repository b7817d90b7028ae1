use std::sync::Arc;

use log::debug;

use crate::capture::PacketSource;
use crate::direction::{ReportDirection, classify};
use crate::error::{Error, Result};
use crate::identity::LocalIdentity;
use crate::ledger::Ledger;
use crate::packet::Packet;
use crate::prefix::PrefixKey;

/// Folds captured packets into the ledger.
pub struct Ingestor {
    identity: LocalIdentity,
    direction: ReportDirection,
    ledger: Arc<Ledger>,
}

impl Ingestor {
    pub fn new(identity: LocalIdentity, direction: ReportDirection, ledger: Arc<Ledger>) -> Self {
        Ingestor {
            identity,
            direction,
            ledger,
        }
    }

    /// Fails when nothing could ever be counted: outbound mode with no local
    /// MAC or IP classifies every packet as `Unknown` and drops it.
    pub fn check(&self) -> Result<()> {
        if self.direction == ReportDirection::Outbound && self.identity.is_empty() {
            return Err(Error::NoLocalIdentity);
        }
        Ok(())
    }

    /// Attributes one packet to its remote prefix. Returns what was
    /// recorded, or `None` when the packet is not counted.
    pub fn ingest(&self, packet: &Packet) -> Option<(PrefixKey, u64)> {
        let network = packet.network.as_ref()?;
        let direction = classify(&self.identity, packet.link.as_ref(), Some(&network.flow));
        if !self.direction.accepts(direction) {
            return None;
        }

        let remote = self.direction.remote(network.flow.src, network.flow.dst);
        let key = PrefixKey::from_ip(remote);
        let bytes = network.accounted_len();
        self.ledger.add(key, bytes);
        Some((key, bytes))
    }

    /// Consumes the source until it ends or fails. Exhaustion is reported as
    /// [`Error::CaptureEnded`]; the loop never returns `Ok`.
    pub fn run<S: PacketSource>(&self, source: &mut S) -> Result<()> {
        let mut seen: u64 = 0;
        while let Some(packet) = source.next_packet()? {
            seen += 1;
            self.ingest(&packet);
        }
        debug!("capture ended after {} packets", seen);
        Err(Error::CaptureEnded)
    }
}
