use clap::Parser;
use std::sync::Arc;

mod cli;
mod config;
mod handler;
mod http;
mod logger;
mod notes;
mod routing;
mod server;
mod session;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::Args::parse();
    let cfg = config::Config::load_from(&args.config, &args.overrides())?;

    if args.check {
        println!("Configuration OK");
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    logger::init(&cfg)?;

    // Worker count from config, one per CPU core otherwise
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
    let listener = server::create_reusable_listener(addr)?;

    let state = Arc::new(config::AppState::new(&cfg).await?);
    server::start_signal_handler(Arc::clone(&state.shutdown))?;
    let routes: Vec<String> = state
        .router
        .routes()
        .map(|(method, pattern)| format!("{method} {pattern}"))
        .collect();
    logger::log_server_start(&addr, &cfg, &routes);

    // LocalSet for spawn_local connection tasks
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(listener, state))
        .await
}
