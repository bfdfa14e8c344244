//! Entry point: load config and run the reference auth endpoint.

use notif_client::config::Config;
use notif_client::services::ChannelSigner;
use notif_client::{create_app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState {
        signer: ChannelSigner::new(config.app_key.clone(), config.app_secret.clone()),
    };
    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, "auth endpoint listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
