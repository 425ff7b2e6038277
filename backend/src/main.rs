use anyhow::Context;
use lendlink_backend::{
    config::Config,
    create_app,
    scheduler::ScheduleDriver,
    telemetry::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(config.log_format);

    let addr = config.socket_addr()?;
    let state = AppState::new(config).await?;
    let shutdown = CancellationToken::new();

    let driver = state.config.scheduler_enabled.then(|| {
        ScheduleDriver::new(state.schedules.clone(), state.config.scheduler_interval())
            .spawn(shutdown.clone())
    });

    let app = create_app(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "lendlink backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Some(driver) = driver {
        if let Err(err) = driver.await {
            tracing::warn!(error = %err, "schedule driver did not stop cleanly");
        }
    }
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
