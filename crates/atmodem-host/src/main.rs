//! Host binary: bring up the modem, register routes, serve.
//!
//! The modem's UART is expected behind a serial/TCP bridge; everything else
//! comes from a YAML config file and/or command-line overrides.

mod config;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use atmodem_engine::{EngineError, Modem, TcpTransport};
use atmodem_http::{HttpError, HttpMethod, HttpService};

use config::{FileConfig, HostConfig};

/// Pause between idle polls; keeps the loop from spinning on a quiet link.
const IDLE_POLL_PAUSE: Duration = Duration::from_millis(10);

#[derive(Debug, Parser)]
#[command(
    name = "atmodem-host",
    about = "Serve a static route table through an AT-command WiFi modem"
)]
struct Args {
    /// YAML config file with bridge address, credentials and routes.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial bridge address (`host:port`), overrides the config file.
    #[arg(long)]
    bridge: Option<String>,

    /// Access point SSID, overrides the config file.
    #[arg(long)]
    ssid: Option<String>,

    /// Access point passphrase, overrides the config file.
    #[arg(long)]
    password: Option<String>,

    /// TCP server port, overrides the config file.
    #[arg(long)]
    port: Option<u16>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Args::parse()) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = HostConfig::merge(file, args.bridge, args.ssid, args.password, args.port)?;

    info!("connecting to serial bridge at {}", config.bridge);
    let transport = TcpTransport::connect(&config.bridge)?;
    let mut service = HttpService::new(Modem::new(transport));

    for route in &config.routes {
        let method = HttpMethod::from_token(&route.method)
            .ok_or_else(|| format!("unknown HTTP method `{}` in config", route.method))?;
        service.register(method, &route.path);
        info!("route registered: {} {}", route.method, route.path);
    }

    service.start(&config.ssid, &config.password, config.port)?;
    match service.modem_mut().station_ip() {
        Ok(ip) => info!("serving on {}:{}", ip, config.port),
        Err(err) => warn!("address query failed: {}", err),
    }

    loop {
        match service.poll() {
            Ok(Some(request)) => {
                info!(
                    "request for {:?} (query: {:?})",
                    request.route, request.query
                );
                if let Err(err) = service.respond_ok(request.channel) {
                    warn!("response failed: {}", err);
                }
            }
            Ok(None) => thread::sleep(IDLE_POLL_PAUSE),
            Err(HttpError::Engine(EngineError::Fatal)) => {
                return Err("modem recovery failed; power-cycle the modem".into());
            }
            Err(err) => warn!("poll failed: {}", err),
        }
    }
}
