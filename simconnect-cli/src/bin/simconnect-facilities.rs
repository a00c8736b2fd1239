//! Standalone CLI tool that dumps a facility list (airports, waypoints,
//! NDBs or VORs in the simulator's reality bubble) as JSON.

use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;

use simconnect_cli::{init_logging, CommonArgs};
use simconnect_core::facility::{shared, FacilityCollector, FacilityDump, SharedDump};
use simconnect_core::recv::{FacilityList, FacilityListKind};

#[derive(Parser)]
#[command(name = "simconnect-facilities", about = "Dump a SimConnect facility list as JSON")]
struct Args {
    /// airport, waypoint, ndb or vor
    #[arg(short, long, default_value = "airport", value_parser = parse_kind)]
    kind: FacilityListKind,

    /// Give up after this many pump cycles without the last record
    #[arg(long, default_value_t = 500)]
    max_pumps: u32,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn parse_kind(s: &str) -> Result<FacilityListKind, String> {
    FacilityListKind::parse(s).ok_or_else(|| format!("unknown facility kind: {s}"))
}

/// Counts records across every kind; used as the shared parent sink.
#[derive(Debug, Default)]
struct RecordCounter {
    records: u32,
}

impl FacilityDump for RecordCounter {
    fn dump(&mut self, list: &FacilityList<'_>) {
        self.records += 1;
        log::debug!(
            "{:?} record {}/{} ({} entries)",
            list.kind,
            list.entry_number + 1,
            list.out_of,
            list.array_size
        );
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.common.verbose);

    let config = args.common.session_config_or_exit();
    let mut session = simconnect_core::session::connect_or_exit(config);

    let counter: Arc<Mutex<RecordCounter>> = shared(RecordCounter::default());
    let collector = shared(FacilityCollector::default());
    let parent: SharedDump = counter.clone();
    let sink: SharedDump = collector.clone();

    if session
        .request_facilities_list(args.kind, parent, sink)
        .is_none()
    {
        std::process::exit(1);
    }

    let mut pumps = 0;
    while !collector.lock().complete && pumps < args.max_pumps && !session.quit_requested() {
        session.pump_once();
        pumps += 1;
    }
    session.close();

    let collector = collector.lock();
    if !collector.complete {
        log::warn!(
            "facility list incomplete after {pumps} pumps ({} records)",
            counter.lock().records
        );
    }

    let output = if args.pretty {
        serde_json::to_string_pretty(&collector.entries)
    } else {
        serde_json::to_string(&collector.entries)
    };
    match output {
        Ok(json) => println!("{json}"),
        Err(e) => {
            log::error!("Failed to serialize facilities: {e}");
            std::process::exit(1);
        }
    }
}
