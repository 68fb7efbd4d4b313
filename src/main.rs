use anyhow::Result;
use lcsp_bot::{bot, config::Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lcsp_bot=info,poise=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Configuration loaded: database={}, admin_roles={:?}, utc_offset={}, stats_window={}d",
        config.database_url,
        config.admin_roles,
        config.utc_offset,
        config.stats_window_days
    );

    let mut client = bot::create_bot(config).await?;

    tracing::info!("Starting LCSP bot...");

    if let Err(why) = client.start().await {
        tracing::error!("Client error: {:?}", why);
    }

    Ok(())
}
