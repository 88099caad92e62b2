use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod page;
mod render;
mod routing;
mod server;

/// How often shutdown re-checks for in-flight connections
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Anything that stops the server before it can serve a request
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("{0}")]
    Address(String),
    #[error("failed to open log files: {0}")]
    Logger(#[source] std::io::Error),
    #[error("failed to load templates: {0}")]
    Templates(#[from] render::RenderError),
    #[error("failed to prepare page directory '{dir}': {source}")]
    Storage {
        dir: String,
        source: std::io::Error,
    },
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&format!("Startup failed: {e}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StartupError> {
    let cfg = config::Config::load()?;
    logger::init(&cfg).map_err(StartupError::Logger)?;

    // Both templates must load before anything is served
    let templates = render::Templates::load(&cfg.templates.dir)?;
    let store =
        page::PageStore::open(&cfg.storage.data_dir).map_err(|source| StartupError::Storage {
            dir: cfg.storage.data_dir.clone(),
            source,
        })?;

    // Tokio runtime, thread count from `server.workers`
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("[CONFIG] Using {workers} worker threads"));
    } else {
        logger::log_info("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;
    let state = Arc::new(config::AppState::new(cfg, store, templates));
    runtime.block_on(async_main(state))
}

async fn async_main(state: Arc<config::AppState>) -> Result<(), StartupError> {
    let addr = state.config.get_socket_addr().map_err(StartupError::Address)?;
    let listener =
        server::create_listener(addr).map_err(|source| StartupError::Bind { addr, source })?;

    logger::log_server_start(&addr, &state.config);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    let active_connections = Arc::new(AtomicUsize::new(0));
    let drain_timeout = Duration::from_secs(state.config.performance.write_timeout);

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            server::start_server_loop(
                listener,
                state,
                Arc::clone(&active_connections),
                shutdown,
            )
            .await;
            drain_connections(&active_connections, drain_timeout).await;
        })
        .await;

    Ok(())
}

/// Give in-flight connections up to `timeout` to finish
async fn drain_connections(active_connections: &AtomicUsize, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while active_connections.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(DRAIN_POLL).await;
    }

    let remaining = active_connections.load(Ordering::SeqCst);
    if remaining > 0 {
        logger::log_warning(&format!("Closing {remaining} connection(s) still open"));
    } else {
        logger::log_info("[Shutdown] All connections closed");
    }
}
