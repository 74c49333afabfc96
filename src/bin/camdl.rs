use std::env;
use std::path::PathBuf;

use cam_dl::{AppConfig, HttpTransport, Notifier, RunMode, Syncer, Transport, config};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("Usage: camdl [OPTIONS]");
    eprintln!();
    eprintln!("Mirrors new photos and videos from a wifi-connected camera.");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  -a, --address <IP>      IP address of the camera (default: {})",
        config::DEFAULT_ADDRESS
    );
    eprintln!(
        "  -p, --port <PORT>       Port of the media server (default: {})",
        config::DEFAULT_PORT
    );
    eprintln!("  -o, --output-dir <DIR>  Where to save downloaded files");
    eprintln!("  -q, --quality <MARKER>  Fetch the variant tagged with this marker (e.g. _LRG)");
    eprintln!("  -d, --daemon            Keep running and re-sync whenever the camera appears");
    eprintln!("      --interval <SECS>   Seconds between daemon passes (default: 10)");
    eprintln!("      --debug             Verbose logging plus the device service description");
    eprintln!("      --version           Print version and exit");
    eprintln!("  -h, --help              Show this help");
}

fn missing_value(flag: &str) -> ! {
    eprintln!("Error: {flag} requires a value");
    std::process::exit(1);
}

struct CliArgs {
    config: AppConfig,
    daemon: bool,
    debug: bool,
}

fn parse_args(mut config: AppConfig) -> CliArgs {
    let mut daemon = false;
    let mut debug = false;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-a" | "--address" => {
                i += 1;
                match args.get(i) {
                    Some(value) => config.device.address = value.clone(),
                    None => missing_value("--address"),
                }
            }
            "-p" | "--port" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(port) => config.device.port = port,
                    None => missing_value("--port"),
                }
            }
            "-o" | "--output-dir" => {
                i += 1;
                match args.get(i) {
                    Some(value) => config.sync.output_dir = PathBuf::from(value),
                    None => missing_value("--output-dir"),
                }
            }
            "-q" | "--quality" => {
                i += 1;
                match args.get(i) {
                    Some(value) => config.sync.quality = Some(value.clone()),
                    None => missing_value("--quality"),
                }
            }
            "--interval" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(secs) => config.daemon.interval_secs = secs,
                    None => missing_value("--interval"),
                }
            }
            "-d" | "--daemon" => daemon = true,
            "--debug" => debug = true,
            "--version" => {
                println!("{VERSION}");
                std::process::exit(0);
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Error: unknown argument {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    CliArgs {
        config,
        daemon,
        debug,
    }
}

#[tokio::main]
async fn main() -> cam_dl::Result<()> {
    let file_config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: {e}, using defaults");
        AppConfig::default()
    });
    let cli = parse_args(file_config);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.debug { "debug" } else { "info" },
    ))
    .init();

    let transport = HttpTransport::new(&cli.config.device)?;

    if cli.debug {
        match transport.service_description().await {
            Ok(description) => log::debug!("service description:\n{description}"),
            Err(e) => log::debug!("could not fetch service description: {e}"),
        }
    }

    let mode = if cli.daemon {
        RunMode::Daemon {
            interval: cli.config.daemon.interval(),
        }
    } else {
        RunMode::Once
    };

    log::info!(
        "syncing {} to {}",
        cli.config.device.base_url(),
        cli.config.sync.output_dir.display()
    );
    let syncer = Syncer::new(transport, cli.config.sync);
    syncer.run(notifier().as_ref(), mode).await
}

/// Desktop notifications when compiled in, silence otherwise.
fn notifier() -> Box<dyn Notifier> {
    #[cfg(feature = "notify")]
    {
        Box::new(cam_dl::DesktopNotifier::new())
    }
    #[cfg(not(feature = "notify"))]
    {
        Box::new(cam_dl::NoNotifier)
    }
}
