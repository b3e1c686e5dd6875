//! setu-ais — AIS sentence relay daemon
//!
//! Maintains a persistent TCP connection to an AIS transponder,
//! reassembles NMEA sentences from the byte stream, and forwards vessel
//! reports (`!AIVDM`/`!AIVDO`) as UDP datagrams to an aggregation
//! service. The uplink is supervised: lost connections are detected by
//! active probing plus kernel keepalive and re-established on a fixed
//! retry delay, forever.

use setu_ais::config::Config;
use setu_ais::error::{Error, Result};
use setu_ais::events::LogSink;
use setu_ais::forwarder::UdpForwarder;
use setu_ais::supervisor::Supervisor;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DEFAULT_CONFIG_PATH: &str = "/etc/setu-ais.toml";

#[derive(Default)]
struct CliArgs {
    config: Option<String>,
    upstream: Option<String>,
    downstream: Option<String>,
    station: Option<String>,
    help: bool,
}

/// Parse command line arguments.
///
/// Supports:
/// - `setu-ais <path>` (positional config path)
/// - `setu-ais --config <path>` / `-c <path>`
/// - `--upstream HOST:PORT`, `--downstream HOST:PORT`, `--station NAME`
fn parse_args() -> std::result::Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut out = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => out.help = true,
            "--config" | "-c" => {
                i += 1;
                out.config = Some(flag_value(&args, i, "--config")?);
            }
            "--upstream" => {
                i += 1;
                out.upstream = Some(flag_value(&args, i, "--upstream")?);
            }
            "--downstream" => {
                i += 1;
                out.downstream = Some(flag_value(&args, i, "--downstream")?);
            }
            "--station" => {
                i += 1;
                out.station = Some(flag_value(&args, i, "--station")?);
            }
            other if !other.starts_with('-') && out.config.is_none() => {
                out.config = Some(other.to_string());
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 1;
    }
    Ok(out)
}

fn flag_value(args: &[String], i: usize, flag: &str) -> std::result::Result<String, String> {
    args.get(i)
        .cloned()
        .ok_or_else(|| format!("Missing value for {}", flag))
}

fn print_usage() {
    println!("setu-ais — AIS sentence relay (TCP transponder -> UDP aggregator)");
    println!();
    println!("Usage: setu-ais [CONFIG] [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config PATH        Config file (default {})", DEFAULT_CONFIG_PATH);
    println!("      --upstream HOST:PORT   AIS transponder TCP endpoint");
    println!("      --downstream HOST:PORT Aggregation service UDP endpoint");
    println!("      --station NAME         Station identity used in notifications");
    println!("  -h, --help               Show this help");
    println!();
    println!("Environment overrides (between file and flags in precedence):");
    println!("  SETU_UPSTREAM_HOST, SETU_UPSTREAM_PORT,");
    println!("  SETU_DOWNSTREAM_HOST, SETU_DOWNSTREAM_PORT,");
    println!("  SETU_STATION, SETU_LOG_LEVEL");
}

fn main() -> Result<()> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };
    if args.help {
        print_usage();
        return Ok(());
    }

    // Precedence: defaults < file < environment < flags
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = Config::load(config_path)?;
    config.apply_env()?;
    if let Some(spec) = &args.upstream {
        config.set_upstream(spec)?;
    }
    if let Some(spec) = &args.downstream {
        config.set_downstream(spec)?;
    }
    if let Some(name) = &args.station {
        config.station.name = name.clone();
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("setu-ais v{} starting", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);
    log::info!(
        "Upstream: {} (TCP), downstream: {} (UDP), station: {}",
        config.upstream.addr(),
        config.downstream.addr(),
        config.station.name
    );

    // The outbound datagram channel is the one thing this process cannot
    // run without; failure here exits with code 1
    let forwarder = UdpForwarder::open(&config.downstream.host, config.downstream.port)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let sink = LogSink::new(config.station.name.clone());
    let mut supervisor = Supervisor::new(
        config.upstream.addr(),
        forwarder,
        sink,
        Arc::clone(&running),
    );
    supervisor.run();

    log::info!("setu-ais stopped");
    Ok(())
}
