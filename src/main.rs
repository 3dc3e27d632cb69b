use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use curriculum_progression::config::Config;
use curriculum_progression::engine::EngineConfig;
use curriculum_progression::logging::init_tracing;
use curriculum_progression::state::AppState;
use curriculum_progression::{create_app, load_store};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let store = match load_store(&config) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "progress store failed to load, refusing to start");
            std::process::exit(1);
        }
    };

    let engine_config = EngineConfig::from_env();
    tracing::info!(
        passing = engine_config.passing_threshold,
        bonus = engine_config.bonus_threshold,
        reinforcement = engine_config.reinforcement_threshold,
        cache_ttl_secs = engine_config.cache_ttl_secs,
        "engine configured"
    );

    let state = AppState::from_store(Arc::new(store), engine_config);
    let purge = spawn_cache_purge(state.clone(), Duration::from_secs(config.cache_purge_secs.max(1)));

    let app = create_app(state);

    let addr = config.bind_addr();
    tracing::info!(%addr, "curriculum-progression listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "bind listener failed");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    purge.abort();
    tracing::info!("Graceful shutdown complete");
}

fn spawn_cache_purge(state: AppState, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let purged = state.progression().cache().purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired cache entries removed");
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
