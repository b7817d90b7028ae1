use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::prefix::PrefixKey;

pub type ByteMap = HashMap<PrefixKey, u64>;

struct State {
    delta: ByteMap,
    cumulative: ByteMap,
    window_start: Instant,
}

/// Per-prefix byte counters shared by the ingestion loop and the reporter.
///
/// Both maps sit behind one lock so that a flush moves every delta byte
/// into the cumulative side without a concurrent `add` slipping between
/// the copy and the reset.
pub struct Ledger {
    state: Mutex<State>,
}

/// Result of one flush: what arrived in the window, totals after merging
/// it, and the window length.
#[derive(Debug, Clone)]
pub struct Flush {
    pub delta: ByteMap,
    pub cumulative: ByteMap,
    pub elapsed: Duration,
}

impl Flush {
    pub fn delta_for(&self, key: &PrefixKey) -> u64 {
        self.delta.get(key).copied().unwrap_or(0)
    }

    pub fn total_for(&self, key: &PrefixKey) -> u64 {
        self.cumulative.get(key).copied().unwrap_or(0)
    }
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            state: Mutex::new(State {
                delta: HashMap::new(),
                cumulative: HashMap::new(),
                window_start: Instant::now(),
            }),
        }
    }

    pub fn add(&self, key: PrefixKey, bytes: u64) {
        let mut state = self.state.lock();
        *state.delta.entry(key).or_insert(0) += bytes;
    }

    pub fn flush_and_merge(&self) -> Flush {
        let now = Instant::now();
        let mut state = self.state.lock();

        let delta = std::mem::take(&mut state.delta);
        for (key, bytes) in &delta {
            *state.cumulative.entry(*key).or_insert(0) += *bytes;
        }
        let elapsed = now.duration_since(state.window_start);
        state.window_start = now;

        Flush {
            delta,
            cumulative: state.cumulative.clone(),
            elapsed,
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
