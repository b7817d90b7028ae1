use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use crossbeam::channel::tick;

use crate::connections::{ActiveConnections, ConnectionProbe};
use crate::format::format_bytes;
use crate::geo::{GeoLookup, GeoRecord};
use crate::ledger::{Flush, Ledger};
use crate::prefix::PrefixKey;
use crate::sort_mode::{SortControl, SortMode};

pub const REPORT_INTERVAL: Duration = Duration::from_secs(5);

const BOLD_START: &str = "\u{1b}[1m";
const BOLD_END: &str = "\u{1b}[22m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub key: PrefixKey,
    pub location: Option<GeoRecord>,
    /// Established connections into the prefix; 0 prints no annotation.
    pub active: usize,
    pub total: u64,
    /// Bytes per second over the last window.
    pub rate: u64,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.key)?;
        if let Some(location) = &self.location {
            write!(f, "{}", location)?;
        }
        write!(f, "]")?;
        if self.active > 0 {
            write!(f, "{} (active, {}){}", BOLD_START, self.active, BOLD_END)?;
        }
        write!(
            f,
            ": {} ({}/s)",
            format_bytes(self.total),
            format_bytes(self.rate)
        )
    }
}

/// One cycle's ranked output. Displays as one line per prefix followed by
/// a blank separator line.
#[derive(Debug, Clone)]
pub struct Report {
    pub mode: SortMode,
    pub elapsed: Duration,
    pub lines: Vec<ReportLine>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Orders every known prefix by `mode` and keeps the first `top`.
/// Equal values fall back to key order.
pub fn rank(flush: &Flush, mode: SortMode, top: usize) -> Vec<PrefixKey> {
    let value = |key: &PrefixKey| match mode {
        SortMode::ByTotal => flush.total_for(key),
        SortMode::ByDelta => flush.delta_for(key),
    };

    let mut keys: Vec<PrefixKey> = flush.cumulative.keys().copied().collect();
    keys.sort_by(|a, b| value(b).cmp(&value(a)).then_with(|| a.cmp(b)));
    keys.truncate(top);
    keys
}

pub struct Reporter {
    ledger: Arc<Ledger>,
    sort: Arc<SortControl>,
    top: usize,
    probe: Option<Box<dyn ConnectionProbe + Send + Sync>>,
    geo: Option<Box<dyn GeoLookup>>,
    timestamps: bool,
}

impl Reporter {
    pub fn new(ledger: Arc<Ledger>, sort: Arc<SortControl>, top: usize) -> Self {
        Reporter {
            ledger,
            sort,
            top,
            probe: None,
            geo: None,
            timestamps: false,
        }
    }

    pub fn with_probe(mut self, probe: Box<dyn ConnectionProbe + Send + Sync>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_geo(mut self, geo: Box<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Flushes the ledger and builds the ranked report for this window.
    pub fn cycle(&self) -> Report {
        let active = self.probe.as_deref().map(|p| ActiveConnections::collect(p));

        let flush = self.ledger.flush_and_merge();
        let mode = self.sort.get();
        let secs = flush.elapsed.as_secs().max(1);

        let lines = rank(&flush, mode, self.top)
            .into_iter()
            .map(|key| ReportLine {
                key,
                location: self.geo.as_ref().and_then(|g| g.locate(key.network())),
                active: active.as_ref().map_or(0, |a| a.count(&key)),
                total: flush.total_for(&key),
                rate: flush.delta_for(&key) / secs,
            })
            .collect();

        Report {
            mode,
            elapsed: flush.elapsed,
            lines,
        }
    }

    /// Prints a report every `interval`. `cycles == 0` runs forever.
    pub fn run<W: Write>(&self, out: &mut W, interval: Duration, cycles: u64) -> io::Result<()> {
        let ticker = tick(interval);
        let mut done = 0;
        while cycles == 0 || done < cycles {
            if ticker.recv().is_err() {
                break;
            }
            let report = self.cycle();
            if self.timestamps {
                writeln!(
                    out,
                    "{} ({:.1}s, by {})",
                    Local::now().format("%H:%M:%S"),
                    report.elapsed.as_secs_f64(),
                    report.mode
                )?;
            }
            write!(out, "{}", report)?;
            out.flush()?;
            done += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    use crate::error::Result;

    fn key(s: &str) -> PrefixKey {
        PrefixKey::from_ip(s.parse().unwrap())
    }

    struct OneConnection;

    impl ConnectionProbe for OneConnection {
        fn tcp4(&self) -> Result<Vec<IpAddr>> {
            Ok(vec!["8.8.8.8".parse().unwrap()])
        }
        fn tcp6(&self) -> Result<Vec<IpAddr>> {
            Ok(Vec::new())
        }
    }

    struct Everywhere;

    impl GeoLookup for Everywhere {
        fn locate(&self, ip: IpAddr) -> Option<GeoRecord> {
            if ip.is_ipv4() {
                Some(GeoRecord {
                    country: Some("US".into()),
                    region: Some("California".into()),
                    city: None,
                })
            } else {
                None
            }
        }
    }

    fn reporter(top: usize) -> (Reporter, Arc<Ledger>, Arc<SortControl>) {
        let ledger = Arc::new(Ledger::new());
        let sort = Arc::new(SortControl::new(SortMode::ByTotal));
        (
            Reporter::new(Arc::clone(&ledger), Arc::clone(&sort), top),
            ledger,
            sort,
        )
    }

    #[test]
    fn rank_by_total_then_delta() {
        let (_, ledger, _) = reporter(10);
        ledger.add(key("1.0.0.1"), 1000);
        ledger.flush_and_merge();
        ledger.add(key("2.0.0.1"), 300);
        ledger.add(key("1.0.0.1"), 100);
        let flush = ledger.flush_and_merge();

        let by_total = rank(&flush, SortMode::ByTotal, 10);
        assert_eq!(by_total, vec![key("1.0.0.1"), key("2.0.0.1")]);
        let by_delta = rank(&flush, SortMode::ByDelta, 10);
        assert_eq!(by_delta, vec![key("2.0.0.1"), key("1.0.0.1")]);
    }

    #[test]
    fn rank_keeps_only_top_n_and_includes_idle_prefixes() {
        let (_, ledger, _) = reporter(2);
        ledger.add(key("3.0.0.1"), 30);
        ledger.add(key("4.0.0.1"), 40);
        ledger.add(key("5.0.0.1"), 50);
        ledger.flush_and_merge();
        let flush = ledger.flush_and_merge();

        assert_eq!(
            rank(&flush, SortMode::ByTotal, 2),
            vec![key("5.0.0.1"), key("4.0.0.1")]
        );
        // nothing arrived in this window: all deltas tie at zero
        assert_eq!(
            rank(&flush, SortMode::ByDelta, 5),
            vec![key("3.0.0.1"), key("4.0.0.1"), key("5.0.0.1")]
        );
    }

    #[test]
    fn ties_break_on_key() {
        let (_, ledger, _) = reporter(10);
        ledger.add(key("9.9.9.9"), 10);
        ledger.add(key("1.1.1.1"), 10);
        let flush = ledger.flush_and_merge();
        assert_eq!(
            rank(&flush, SortMode::ByTotal, 10),
            vec![key("1.1.1.1"), key("9.9.9.9")]
        );
    }

    #[test]
    fn cycle_annotates_lines() {
        let (reporter, ledger, _) = reporter(10);
        let reporter = reporter
            .with_probe(Box::new(OneConnection))
            .with_geo(Box::new(Everywhere));
        ledger.add(key("8.8.8.8"), 2048);
        ledger.add(key("2001:db8::1"), 20);

        let report = reporter.cycle();
        assert_eq!(report.lines.len(), 2);
        assert_eq!(
            report.lines[0].to_string(),
            "8.8.8.0/24[US California]\u{1b}[1m (active, 1)\u{1b}[22m: 2.0 KiB (2.0 KiB/s)"
        );
        assert_eq!(report.lines[1].to_string(), "2001:db8::/48[]: 20 B (20 B/s)");
    }

    #[test]
    fn rate_divides_by_whole_seconds() {
        let line = ReportLine {
            key: key("10.0.0.1"),
            location: None,
            active: 0,
            total: 5000,
            rate: 5000 / Duration::from_millis(5020).as_secs().max(1),
        };
        assert_eq!(line.to_string(), "10.0.0.0/24[]: 4.9 KiB (1000 B/s)");
    }

    #[test]
    fn toggling_sort_does_not_touch_counts() {
        let (reporter, ledger, sort) = reporter(10);
        ledger.add(key("1.0.0.1"), 500);
        ledger.add(key("2.0.0.1"), 100);
        let first = reporter.cycle();
        ledger.add(key("2.0.0.1"), 300);
        sort.toggle();
        let second = reporter.cycle();

        assert_eq!(second.mode, SortMode::ByDelta);
        assert_eq!(first.lines[0].key, key("1.0.0.1"));
        assert_eq!(second.lines[0].key, key("2.0.0.1"));
        assert_eq!(second.lines[0].total, 400);
        assert_eq!(second.lines[1].total, 500);
    }

    #[test]
    fn run_writes_blank_line_after_each_cycle() {
        let (reporter, ledger, _) = reporter(10);
        ledger.add(key("1.0.0.1"), 64);
        let mut out = Vec::new();
        reporter.run(&mut out, Duration::from_millis(10), 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        let cycles: Vec<&str> = text.split("\n\n").filter(|s| !s.is_empty()).collect();
        assert_eq!(cycles.len(), 2);
        assert!(cycles[0].starts_with("1.0.0.0/24[]: 64 B"));
        assert!(cycles[1].starts_with("1.0.0.0/24[]: 64 B (0 B/s)"));
    }

    #[test]
    fn line_without_location_keeps_empty_brackets() {
        let (reporter, ledger, _) = reporter(10);
        let reporter = reporter.with_geo(Box::new(Everywhere));
        ledger.add(key("8.8.8.8"), 50);
        ledger.add(key("2001:db8::1"), 20);

        let report = reporter.cycle();
        assert_eq!(report.lines[0].to_string(), "8.8.8.0/24[US California]: 50 B (50 B/s)");
        assert_eq!(report.lines[1].to_string(), "2001:db8::/48[]: 20 B (20 B/s)");
    }

    #[test]
    fn timestamp_line_shows_window_and_mode() {
        let (reporter, ledger, sort) = reporter(10);
        let reporter = reporter.with_timestamps(true);
        sort.toggle();
        ledger.add(key("1.0.0.1"), 64);
        let mut out = Vec::new();
        reporter.run(&mut out, Duration::from_millis(10), 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.len(), "00:00:00 (0.0s, by delta)".len());
        assert!(header.ends_with("s, by delta)"));
        assert_eq!(header.as_bytes()[2], b':');
        assert_eq!(lines.next(), Some("1.0.0.0/24[]: 64 B (64 B/s)"));
    }
}
