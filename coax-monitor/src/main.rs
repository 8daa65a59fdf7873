//! Coax Switch Monitor
//!
//! Command-line monitor for the antenna switch path. Finds the controller
//! (or runs against the built-in simulator), optionally drives the relays
//! to a requested configuration, then follows the reconciled state and
//! prints every change with its path classification.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use coax_protocol::{SwitchId, SwitchPosition};
use coax_route::{
    actor, Classification, PathResult, RouteConfig, RouteEvent, StoreView, SwitchGateway,
    SwitchState, DEFAULT_BAUD,
};
use coax_sim::{spawn_bank, VirtualBankConfig};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for a single controller reply
const REPLY_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Options {
    /// Serial port override; auto-detected when absent
    port: Option<String>,
    /// Run against the virtual switch bank instead of hardware
    sim: bool,
    /// Emit one JSON record per state change instead of text
    json: bool,
    /// Relay moves to apply once connected
    sets: Vec<(SwitchId, SwitchPosition)>,
}

/// One state change, as printed in `--json` mode
#[derive(Debug, Serialize)]
struct StatusRecord {
    connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    switches: Option<SwitchState>,
    classification: Classification,
    reaches_antenna: bool,
    energized: Vec<String>,
}

impl StatusRecord {
    fn new(view: StoreView, path: PathResult) -> Self {
        Self {
            connected: view.is_connected(),
            switches: view.state(),
            classification: path.classification,
            reaches_antenna: path.reaches,
            energized: path.energized.iter().map(|e| e.to_string()).collect(),
        }
    }
}

fn usage() {
    eprintln!("Usage: coax-monitor [PORT] [--sim] [--json] [--set SWITCH_POS]...");
    eprintln!();
    eprintln!("  PORT            serial port of the switch controller");
    eprintln!("                  (auto-detected when omitted; COAX_SWITCH_PORT overrides)");
    eprintln!("  --sim           run against the virtual switch bank");
    eprintln!("  --json          print one JSON record per state change");
    eprintln!("  --set S1_2      move a relay after connecting (repeatable)");
}

fn parse_set(spec: &str) -> Result<(SwitchId, SwitchPosition)> {
    let (id, position) = spec
        .split_once(['_', '='])
        .with_context(|| format!("bad set spec '{}', expected e.g. S1_2", spec))?;
    Ok((
        SwitchId::parse(id).with_context(|| format!("bad set spec '{}'", spec))?,
        SwitchPosition::parse(position).with_context(|| format!("bad set spec '{}'", spec))?,
    ))
}

fn parse_args() -> Result<Option<Options>> {
    let mut opts = Options::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--sim" => opts.sim = true,
            "--json" => opts.json = true,
            "--set" => {
                let spec = args.next().context("--set needs an argument, e.g. S1_2")?;
                opts.sets.push(parse_set(&spec)?);
            }
            other if other.starts_with('-') => bail!("unknown option: {}", other),
            other => {
                if opts.port.is_some() {
                    bail!("more than one port given");
                }
                opts.port = Some(other.to_string());
            }
        }
    }

    Ok(Some(opts))
}

fn print_change(opts: &Options, view: StoreView, path: PathResult) {
    if opts.json {
        let record = StatusRecord::new(view, path);
        match serde_json::to_string(&record) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to encode record: {}", e),
        }
        return;
    }

    match view {
        StoreView::Connected(state) => {
            let reach = if path.reaches {
                "antenna reachable"
            } else {
                "no antenna path"
            };
            println!("{}  path={} ({})", state, path.classification.name(), reach);
        }
        StoreView::Disconnected => println!("disconnected  path=inactive"),
    }
}

async fn run(opts: Options) -> Result<()> {
    let config = RouteConfig::default();

    let (handle, mut events, _task) = if opts.sim {
        info!("Starting virtual switch bank");
        let (host, _bank) = spawn_bank(VirtualBankConfig::default());
        actor::start(SwitchGateway::new(host, REPLY_TIMEOUT), config)
    } else {
        let port = match &opts.port {
            Some(port) => port.clone(),
            None => coax_detect::find_switch_port()
                .await
                .context("no controller found; pass a port or set COAX_SWITCH_PORT")?,
        };
        info!("Connecting to {} at {} baud", port, DEFAULT_BAUD);
        let gateway = SwitchGateway::connect(&port, DEFAULT_BAUD, REPLY_TIMEOUT)
            .with_context(|| format!("failed to open {}", port))?;
        actor::start(gateway, config)
    };

    for &(id, position) in &opts.sets {
        handle
            .set_switch(id, position)
            .await
            .with_context(|| format!("failed to set {} to {}", id, position))?;
        info!("Set {} to {}", id, position);
    }

    while let Some(event) = events.recv().await {
        match event {
            RouteEvent::StateChanged { view, path } => print_change(&opts, view, path),
            RouteEvent::Stopped => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coax_monitor=info,coax_protocol=info,coax_detect=info,coax_route=info,coax_sim=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let opts = match parse_args() {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            usage();
            return ExitCode::FAILURE;
        }
    };

    match run(opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_underscore() {
        let (id, position) = parse_set("S1_2").unwrap();
        assert_eq!(id, SwitchId::S1);
        assert_eq!(position, SwitchPosition::P2);
    }

    #[test]
    fn test_parse_set_equals() {
        let (id, position) = parse_set("S3=1").unwrap();
        assert_eq!(id, SwitchId::S3);
        assert_eq!(position, SwitchPosition::P1);
    }

    #[test]
    fn test_parse_set_rejects_garbage() {
        assert!(parse_set("S4_1").is_err());
        assert!(parse_set("S1_3").is_err());
        assert!(parse_set("S1").is_err());
    }

    #[test]
    fn test_status_record_shapes_json() {
        let view = StoreView::Connected(SwitchState::new(
            SwitchPosition::P1,
            SwitchPosition::P2,
            SwitchPosition::P2,
        ));
        let path = coax_route::compute_path(&view);

        let json = serde_json::to_string(&StatusRecord::new(view, path)).unwrap();
        assert!(json.contains("\"connected\":true"));
        assert!(json.contains("\"classification\":\"valid-tx\""));
        assert!(json.contains("\"reaches_antenna\":true"));
    }

    #[test]
    fn test_disconnected_record_omits_switches() {
        let view = StoreView::Disconnected;
        let path = coax_route::compute_path(&view);

        let json = serde_json::to_string(&StatusRecord::new(view, path)).unwrap();
        assert!(json.contains("\"connected\":false"));
        assert!(!json.contains("switches"));
    }
}
