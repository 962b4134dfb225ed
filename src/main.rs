use backtrace::Backtrace;
use tokio::sync::Notify;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

use std::path::PathBuf;
use std::sync::Arc;

mod agent;
mod collectors;
mod config;
mod exposition;
mod metrics;
mod pusher;

use agent::Agent;
use collectors::Registry;
use config::{Config, LogFormat};

fn main() {
    // custom panic hook to terminate whole process after unwinding
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    let mut registry = Registry::new();
    if let Err(e) = collectors::register_all(&mut registry) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let names = registry.names();

    // parse command line options
    let matches = config::command(&names).get_matches();

    // load config from file, flags take precedence
    let config: Arc<Config> = {
        let mut config = match matches.get_one::<PathBuf>("CONFIG") {
            Some(file) => match Config::load(file) {
                Ok(c) => c,
                Err(error) => {
                    eprintln!("error loading config file: {}\n{error}", file.display());
                    std::process::exit(1);
                }
            },
            None => Config::default(),
        };

        config.apply_args(&matches, &names);

        if let Err(error) = config.check() {
            eprintln!("invalid configuration: {error}");
            std::process::exit(1);
        }

        config.into()
    };

    // configure logging
    let level: LevelFilter = config.log().level().into();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    match config.log().format() {
        LogFormat::Logfmt => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    info!("starting node-pusher {}", env!("CARGO_PKG_VERSION"));
    debug!(
        "procfs: {} sysfs: {} rootfs: {}",
        config.paths().procfs().display(),
        config.paths().sysfs().display(),
        config.paths().rootfs().display()
    );

    let collectors = match registry.build(
        &config.overrides(),
        config.disable_defaults(),
        config.clone(),
    ) {
        Ok(collectors) => collectors,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    let agent = match Agent::new(&config, collectors) {
        Ok(agent) => agent,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    // initialize async runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .thread_name("node-pusher")
        .build()
        .expect("failed to launch async runtime");

    let shutdown = Arc::new(Notify::new());

    let signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || signal.notify_one()) {
        eprintln!("failed to set signal handler: {e}");
        std::process::exit(1);
    }

    rt.block_on(agent.run(shutdown));

    info!("user shutdown");
}
