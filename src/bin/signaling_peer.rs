//! A signaling peer: joins the hub and exchanges codecs and candidates with
//! every other participant.

use std::sync::Arc;
use std::{env, process};

use meshsignal::client::{Client, ClientError, run_client};
use meshsignal::config::{Config, SignalingConfig};
use meshsignal::log::logger::DEFAULT_QUEUE_CAP;
use meshsignal::log::{LogSink, Logger};
use meshsignal::participant::NegotiatingFactory;

fn main() {
    // --- Parse CLI args ----------------------------------------------------
    //
    // Supported:
    //   signaling_peer                         -> peer.conf (if present)
    //   signaling_peer my.conf                 -> custom config
    //   signaling_peer my.conf HOST PORT       -> hub address override
    //   signaling_peer my.conf HOST PORT NAME  -> and display name
    let args: Vec<String> = env::args().collect();
    if !matches!(args.len(), 1 | 2 | 4 | 5) {
        usage(&args[0]);
    }

    let config = match args.get(1) {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => Config::load("peer.conf").unwrap_or_else(|_| Config::empty()),
    };
    let mut settings = SignalingConfig::from_config(&config).unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        process::exit(1);
    });
    if args.len() >= 4 {
        settings.hub_host = args[2].clone();
        settings.hub_port = args[3].parse().unwrap_or_else(|_| usage(&args[0]));
    }
    if let Some(name) = args.get(4) {
        settings.display_name = name.clone();
    }

    let logger = Logger::start_peer(DEFAULT_QUEUE_CAP, &config);
    let log: Arc<dyn LogSink> = Arc::new(logger.handle());

    let factory = NegotiatingFactory::new(settings.media.clone(), log.clone());
    let client = Client::new(settings.display_name.clone(), Box::new(factory), log.clone());

    eprintln!(
        "[signaling_peer] '{}' joining {}:{} (log: {})",
        settings.display_name,
        settings.hub_host,
        settings.hub_port,
        logger.file_path().display()
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            process::exit(1);
        }
    };
    let result = runtime.block_on(run_client(
        &settings.hub_host,
        settings.hub_port,
        client,
        log,
    ));
    drop(runtime);
    logger.shutdown();

    match result {
        Ok(()) | Err(ClientError::Disconnected) => {
            eprintln!("[signaling_peer] hub went away");
        }
        Err(e) => {
            eprintln!("[signaling_peer] {e}");
            process::exit(1);
        }
    }
}

fn usage(prog: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {prog}                          # peer.conf or defaults");
    eprintln!("  {prog} [CONFIG]                 # e.g. peer.conf");
    eprintln!("  {prog} [CONFIG] HOST PORT       # e.g. peer.conf 127.0.0.1 9893");
    eprintln!("  {prog} [CONFIG] HOST PORT NAME  # e.g. peer.conf 127.0.0.1 9893 alice");
    process::exit(1);
}
