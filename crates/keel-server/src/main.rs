mod admission;
mod api;
mod config;
mod error;
mod plugins;
mod state;

use std::sync::Arc;

use keel_core::Registration;
use keel_db::DbRegistry;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let settings = Settings::from_env()?;
    let registry = Arc::new(DbRegistry::new(&settings.database_url)?);

    // Serving traffic unregistered is not an option: any failure here exits.
    let mut registration = Registration::boot(
        registry.as_ref(),
        &settings.deployment,
        &plugins::default_plugins(),
    )?;

    let state = AppState {
        registry: registry.clone(),
        service: registration.service().clone(),
        instance: registration.instance().clone(),
        metrics: handle,
        max_body_bytes: settings.max_body_bytes,
    };
    let app = api::router(state);

    tracing::info!("listening on {}", settings.bind_addr);
    let served = match axum::Server::try_bind(&settings.bind_addr) {
        Ok(builder) => builder
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await,
        Err(e) => Err(e),
    };

    registration.shutdown(registry.as_ref());

    if let Err(e) = served {
        tracing::error!("server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install signal handler: {}", e);
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

    tracing::info!("signal received, starting graceful shutdown");
}
