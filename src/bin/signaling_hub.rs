//! The rendezvous hub: assigns participant ids and relays signaling frames.

use std::sync::Arc;
use std::{env, process};

use meshsignal::config::{Config, SignalingConfig};
use meshsignal::hub::{Hub, Listener, run_hub};
use meshsignal::log::logger::DEFAULT_QUEUE_CAP;
use meshsignal::log::{LogSink, Logger};
use meshsignal::participant::NegotiatingFactory;

fn main() -> std::io::Result<()> {
    // --- Parse CLI args ----------------------------------------------------
    //
    // Supported:
    //   signaling_hub                    -> hub.conf (if present), port from config
    //   signaling_hub my.conf            -> custom config
    //   signaling_hub my.conf 9000       -> custom config, port override
    let args: Vec<String> = env::args().collect();
    let (config_path, port_arg) = match args.len() {
        1 => (None, None),
        2 => (Some(args[1].as_str()), None),
        3 => (Some(args[1].as_str()), Some(args[2].as_str())),
        _ => usage(&args[0]),
    };

    let config = match config_path {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => Config::load("hub.conf").unwrap_or_else(|_| Config::empty()),
    };
    let mut settings = SignalingConfig::from_config(&config).unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        process::exit(1);
    });
    if let Some(p) = port_arg {
        settings.listen_port = p.parse().unwrap_or_else(|_| usage(&args[0]));
    }

    // --- Start process logger ----------------------------------------------
    let logger = Logger::start_hub(DEFAULT_QUEUE_CAP, &config);
    let log: Arc<dyn LogSink> = Arc::new(logger.handle());

    // --- Bind before entering the reactor ----------------------------------
    let listener = Listener::bind(&settings.listen_host, settings.listen_port)?;
    eprintln!(
        "[signaling_hub] listening on {}:{} (log: {})",
        settings.listen_host,
        listener.local_port(),
        logger.file_path().display()
    );

    let factory = NegotiatingFactory::new(settings.media.clone(), log.clone());
    let hub = Hub::new(settings.display_name.clone(), Box::new(factory), log.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_hub(listener, hub, log));

    drop(runtime);
    logger.shutdown();
    result
}

fn usage(prog: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {prog}                  # hub.conf or defaults");
    eprintln!("  {prog} [CONFIG]         # e.g. hub.conf");
    eprintln!("  {prog} [CONFIG] [PORT]  # e.g. hub.conf 9893");
    process::exit(1);
}
