use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::build_info::APP_NAME_VERSION;
use crate::jobs::job_funcs::init_scheduler::task_init;
use crate::routers::main_router::build_router;

use super::{config::ServerConfig, state::ServerState};

pub async fn server_init_proc(
    start: tokio::time::Instant,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let state = Arc::new(
        ServerState::builder()
            .app_name_version(APP_NAME_VERSION.to_owned())
            .server_start_time(start)
            .verifier_config(config.verifier.clone())
            .build()?,
    );

    task_init(Arc::clone(&state)).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    info!(
        app = %state.get_app_name_version(),
        addr = %listener.local_addr()?,
        workers = %config.workers,
        request_timeout = ?config.request_timeout,
        elapsed = ?start.elapsed(),
        "Backend server starting..."
    );

    let shutdown_state = Arc::clone(&state);
    axum::serve(
        listener,
        build_router(Arc::clone(&state), config.request_timeout)
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        shutdown_state.close_verifications();
    })
    .await?;

    info!(
        responses_handled = %state.get_responses_handled(),
        cached_results = %state.get_verification_cache_len(),
        uptime = ?state.get_uptime(),
        "Server shut down"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not install SIGTERM handler");
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

    info!("Shutdown signal received, draining connections...");
}
