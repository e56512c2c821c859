mod api;
mod config;
mod error;
mod main_lib;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qsleads_core::generation::GenerationServiceTrait;
use qsleads_core::store::RemoteStoreGateway;
use qsleads_generation::GeminiGenerationService;
use qsleads_remote_store::SupabaseGateway;

use crate::config::ServerConfig;
use crate::main_lib::{app_router, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env().context("invalid listen address")?;

    let gateway: Option<Arc<dyn RemoteStoreGateway>> = config
        .store
        .clone()
        .map(|store| Arc::new(SupabaseGateway::new(Some(store))) as Arc<dyn RemoteStoreGateway>);

    let generation: Option<Arc<dyn GenerationServiceTrait>> = match config.generation.clone() {
        Some(settings) => Some(Arc::new(
            GeminiGenerationService::new(settings).context("failed to build generation client")?,
        )),
        None => {
            info!("GEMINI_API_KEY not set; generation routes will answer 503");
            None
        }
    };

    let state = Arc::new(AppState::new(gateway, generation));
    state.load().await;

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(
        "QS Leads listening on {} ({})",
        config.listen_addr,
        state.mode.label()
    );

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;
    Ok(())
}
