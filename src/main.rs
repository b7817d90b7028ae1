/**********************************************************************
 * prefixtop: per-prefix bandwidth top for one interface
 * Compile with:
 * cargo build --release
 *
 * Needs capture privileges on the interface (root or CAP_NET_RAW).
 **********************************************************************/

use std::io::{self, IsTerminal, Write};
use std::process;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Env, Target};
use log::{error, info, warn};

use prefixtop::Error;
use prefixtop::capture::PcapSource;
use prefixtop::cli::Args;
use prefixtop::config::Settings;
use prefixtop::connections::ProcNetProbe;
use prefixtop::geo::MaxMindGeo;
use prefixtop::identity::LocalIdentity;
use prefixtop::ingest::Ingestor;
use prefixtop::keys::{CrlfWriter, RawMode, read_keys};
use prefixtop::ledger::Ledger;
use prefixtop::report::{REPORT_INTERVAL, Reporter};
use prefixtop::sort_mode::SortControl;

fn init_logging(raw_terminal: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if raw_terminal {
        builder.target(Target::Pipe(Box::new(CrlfWriter::new(io::stderr()))));
    }
    builder.init();
}

fn stdout_writer(raw_terminal: bool) -> Box<dyn Write + Send> {
    if raw_terminal {
        Box::new(CrlfWriter::new(io::stdout()))
    } else {
        Box::new(io::stdout())
    }
}

fn run(settings: Settings, raw_terminal: bool) -> Result<()> {
    let filter = settings.filter.as_deref();
    let mut source = match &settings.read_file {
        Some(path) => PcapSource::open_file(path, filter)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => PcapSource::open_live(&settings.interface, filter)
            .with_context(|| format!("cannot capture on {}", settings.interface))?,
    };

    let replay = settings.read_file.is_some();
    let identity = match LocalIdentity::from_overrides(settings.local_mac, &settings.local_ips) {
        Some(identity) => identity,
        None => match LocalIdentity::resolve(&settings.interface) {
            Ok(identity) => {
                if replay {
                    warn!(
                        "Classifying the replay with the addresses of {}; use --local-mac/--local-ip if it was captured elsewhere",
                        settings.interface
                    );
                }
                identity
            }
            Err(e) if replay => {
                warn!("{}; replaying without local addresses", e);
                LocalIdentity::default()
            }
            Err(e) => return Err(e).context("cannot resolve local addresses"),
        },
    };
    identity.log();

    let ledger = Arc::new(Ledger::new());
    let ingestor = Ingestor::new(identity, settings.direction, Arc::clone(&ledger));
    ingestor.check()?;
    let sort = Arc::new(SortControl::new(settings.sort));

    let mut reporter = Reporter::new(Arc::clone(&ledger), Arc::clone(&sort), settings.top)
        .with_timestamps(settings.timestamps);
    if settings.netstat {
        reporter = reporter.with_probe(Box::new(ProcNetProbe));
    }
    if let Some(path) = &settings.geo_db {
        match MaxMindGeo::open(path, &settings.geo_lang) {
            Ok(geo) => {
                info!("Geo database: {}", path.display());
                reporter = reporter.with_geo(Box::new(geo));
            }
            Err(e) => {
                warn!("Error opening geo database {}: {}", path.display(), e);
                info!("Continuing without geo database");
            }
        }
    }
    let reporter = Arc::new(reporter);

    let _raw = if raw_terminal {
        Some(RawMode::enable().context("cannot switch terminal to raw mode")?)
    } else {
        None
    };

    let mut out = stdout_writer(raw_terminal);
    writeln!(out, "Starting...")?;
    out.flush()?;

    if raw_terminal {
        let sort = Arc::clone(&sort);
        thread::spawn(move || {
            let mut out = stdout_writer(true);
            // read_keys restores the terminal on both quit and error
            if read_keys(sort, &mut out).is_ok() {
                process::exit(0);
            }
        });
    }

    {
        let reporter = Arc::clone(&reporter);
        let count = settings.count;
        thread::spawn(move || {
            let mut out = stdout_writer(raw_terminal);
            if let Err(e) = reporter.run(&mut out, REPORT_INTERVAL, count) {
                error!("report output: {}", e);
            }
            RawMode::restore();
            process::exit(0);
        });
    }

    match ingestor.run(&mut source) {
        // replay finished: show what was read instead of waiting for the timer
        Err(Error::CaptureEnded) if settings.read_file.is_some() => {
            write!(out, "{}", reporter.cycle())?;
            out.flush()?;
            Ok(())
        }
        Err(e) => Err(e).context("capture stopped"),
        Ok(()) => Ok(()),
    }
}

fn main() {
    let args = Args::parse();
    let settings = Settings::from(args);
    let raw_terminal = settings.keys && io::stdin().is_terminal();

    init_logging(raw_terminal);

    if let Err(e) = run(settings, raw_terminal) {
        error!("{:#}", e);
        RawMode::restore();
        process::exit(1);
    }
}
