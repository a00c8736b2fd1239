//! Standalone CLI tool for sending a simulator event to the user aircraft.

use clap::Parser;

use simconnect_cli::{init_logging, CommonArgs};

#[derive(Parser)]
#[command(name = "simconnect-event", about = "Transmit a simulator event, e.g. PARKING_BRAKES")]
struct Args {
    /// Simulator event name
    name: String,

    /// Event data (decimal or 0x-prefixed hex)
    #[arg(short, long, default_value = "0", value_parser = parse_hex_or_dec)]
    data: u32,

    #[command(flatten)]
    common: CommonArgs,
}

fn parse_hex_or_dec(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u32>().map_err(|e| e.to_string())
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.common.verbose);

    let config = args.common.session_config_or_exit();
    let mut session = simconnect_core::session::connect_or_exit(config);

    let Some(event) = session.map_to_sim_event(&args.name) else {
        std::process::exit(1);
    };
    let sent = session.send_event(event, args.data);
    // Let the simulator drain the send before the handle goes away.
    session.pump_once();
    session.close();

    if sent {
        println!("Sent {} (event {event}, data {})", args.name, args.data);
    } else {
        log::error!("TransmitClientEvent failed for {}", args.name);
        std::process::exit(1);
    }
}
