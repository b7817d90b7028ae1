use std::fmt;

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    ByTotal,
    ByDelta,
}

impl SortMode {
    pub fn toggled(self) -> Self {
        match self {
            SortMode::ByTotal => SortMode::ByDelta,
            SortMode::ByDelta => SortMode::ByTotal,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::ByTotal => write!(f, "total"),
            SortMode::ByDelta => write!(f, "delta"),
        }
    }
}

/// Current sort order, flipped from the keyboard and read by the reporter.
/// Has its own lock, independent of the ledger's.
#[derive(Debug, Default)]
pub struct SortControl {
    mode: RwLock<SortMode>,
}

impl SortControl {
    pub fn new(mode: SortMode) -> Self {
        SortControl {
            mode: RwLock::new(mode),
        }
    }

    pub fn get(&self) -> SortMode {
        *self.mode.read()
    }

    /// Flips the mode and returns the new one.
    pub fn toggle(&self) -> SortMode {
        let mut mode = self.mode.write();
        *mode = mode.toggled();
        *mode
    }
}
