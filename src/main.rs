use std::sync::Arc;

use coi_server::config::{AppState, Config};
use coi_server::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    // Worker thread count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    // Port already in use ends the process here
    let listener = server::create_reusable_listener(addr)?;

    logger::log_server_start(&cfg);

    let state = Arc::new(AppState::new(&cfg));
    server::run(listener, state, interrupted()).await
}

/// Resolves on Ctrl+C; if the handler can't be installed, never resolves
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
        std::future::pending::<()>().await;
    }
}
