//! warden - HTTP server entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden::engine::scripted::ScriptedEngineFactory;
use warden::{api, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // The stock binary drives the scripted replay engine. Deployments
    // with a provider-backed engine embed the crate and call
    // `api::serve` with their own factory.
    let script_path = config.engine_script.clone().ok_or_else(|| {
        anyhow::anyhow!("ENGINE_SCRIPT is not set; point it at a JSON step file")
    })?;
    let raw = tokio::fs::read_to_string(&script_path).await?;
    let script: serde_json::Value = serde_json::from_str(&raw)?;
    let engines = Arc::new(ScriptedEngineFactory::from_script(&script)?);

    tracing::info!(
        workspace = %config.workspace_path.display(),
        batch_threshold = config.batch_approval_threshold,
        "starting warden on {}:{}",
        config.host,
        config.port
    );

    api::serve(config, engines).await
}
