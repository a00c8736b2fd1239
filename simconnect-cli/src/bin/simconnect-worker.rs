//! JSON-RPC IPC worker holding one SimConnect session.
//!
//! Reads line-delimited JSON requests from stdin, dispatches them to the
//! session, writes JSON responses to stdout.  Logs go to stderr.

use std::io::{self, BufRead, Write};

use clap::Parser;
use serde::{Deserialize, Serialize};

use simconnect_cli::{init_logging, CommonArgs, Worker};

#[derive(Parser)]
#[command(name = "simconnect-worker", about = "SimConnect IPC worker process")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Deserialize)]
struct Request {
    id: u64,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Serialize)]
struct Response {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn write_response(stdout: &mut impl Write, resp: &Response) {
    if let Ok(json) = serde_json::to_string(resp) {
        let _ = writeln!(stdout, "{json}");
    } else {
        // Serialization failed -- send minimal error response.
        let _ = writeln!(
            stdout,
            r#"{{"id":{},"error":"response serialization failed"}}"#,
            resp.id
        );
    }
    let _ = stdout.flush();
}

fn main() {
    let args = Args::parse();
    init_logging(args.common.verbose);

    let config = args.common.session_config_or_exit();
    let mut worker = Worker::new(simconnect_core::session::connect_or_exit(config));
    log::info!("simconnect-worker: ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("stdin read error: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // Parse error -- use id=0 since we can't extract it.
                let resp = Response {
                    id: 0,
                    result: None,
                    error: Some(format!("invalid JSON: {e}")),
                };
                write_response(&mut stdout, &resp);
                continue;
            }
        };

        let resp = match worker.dispatch(&req.method, &req.params) {
            Ok(result) => Response {
                id: req.id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id: req.id,
                result: None,
                error: Some(error),
            },
        };
        write_response(&mut stdout, &resp);

        if worker.session().quit_requested() {
            log::info!("simulator quit, worker exiting");
            break;
        }
    }

    worker.session_mut().close();
}
