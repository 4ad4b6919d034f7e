//! # Batch Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración, instala el logging, levanta el servidor y, al
//! recibir Ctrl-C, deja de aceptar conexiones y apaga el pool una sola vez.

use batch_server::config::Config;
use batch_server::server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::new();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("batch_server {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        std::process::exit(2);
    }
    config.print_summary();

    let server = Server::new(config);

    let stop = server.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("interrupt received, stopping server");
        stop.stop();
    }) {
        error!(error = %e, "failed to install Ctrl-C handler");
    }

    let result = server.run();
    server.shutdown();

    if let Err(e) = result {
        error!(error = %e, "fatal server error");
        std::process::exit(1);
    }

    info!("bye");
}
