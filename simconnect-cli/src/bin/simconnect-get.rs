//! Standalone CLI tool that reads one simulation variable of the user
//! aircraft and prints it as JSON.

use clap::Parser;
use serde_json::json;

use simconnect_cli::{init_logging, out_data_json, CommonArgs};
use simconnect_core::request::Definition;

#[derive(Parser)]
#[command(name = "simconnect-get", about = "Read a simulation variable of the user aircraft")]
struct Args {
    /// Simulation variable, e.g. "PLANE ALTITUDE"
    #[arg(long)]
    var: String,

    /// Units, e.g. "feet"; use "string" for text variables
    #[arg(long, default_value = "number")]
    units: String,

    /// Pump cycles to wait for the answer (overrides the config)
    #[arg(long)]
    attempts: Option<u32>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let args = Args::parse();
    init_logging(args.common.verbose);

    let mut config = args.common.session_config_or_exit();
    if let Some(attempts) = args.attempts {
        config.max_attempts = attempts.max(1);
    }
    let mut session = simconnect_core::session::connect_or_exit(config);

    let Some(id) = session.new_request(vec![Definition::new(&args.var, &args.units)]) else {
        log::error!("could not define {}", args.var);
        std::process::exit(1);
    };

    let ok = session.get_data(id);
    let output = json!({
        "var": args.var,
        "units": args.units,
        "value": out_data_json(session.out_data(id)),
    });
    println!("{output}");

    session.close();
    if !ok {
        log::warn!("no value for {} within {} attempts", args.var, session.config().max_attempts);
        std::process::exit(1);
    }
}
