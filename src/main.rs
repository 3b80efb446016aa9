use clap::Parser;
use std::sync::Arc;

mod api;
mod cli;
mod config;
mod handler;
mod http;
mod logger;
mod server;
mod store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::Args::parse();
    let cfg = config::Config::load_from(&args.config)?.with_bind(args.host, args.port);

    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let listener = match server::create_listener(addr) {
        Ok(listener) => listener,
        Err(e) => {
            logger::log_bind_failed(&addr, &e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(config::AppState::new(cfg));
    logger::log_server_start(&addr, &state);

    // Connections are spawned with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state))
        .await;

    Ok(())
}
