use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use queue_core::config::{
    already_serving_policy_from_env_value, display_next_up_from_env_value,
    seed_counters_from_env_value,
};
use queue_core::constants::DEFAULT_REST_ADDR;
use queue_core::CoreConfig;

/// `RUST_LOG` plus info for the queue crates and the REST handlers' transition logs.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("queue=info".parse()?)
        .add_directive("api_rest=info".parse()?))
}

/// Main entry point for the queue server
///
/// Serves the REST API until the process is stopped.
///
/// # Environment Variables
/// - `QUEUE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `QUEUE_ALREADY_SERVING_POLICY`: `reject` (default) or `auto-complete`
/// - `QUEUE_DISPLAY_NEXT_UP`: upcoming numbers shown per counter on the board (default: 3)
/// - `QUEUE_COUNTERS`: comma-separated counter titles opened at startup
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::new(
        already_serving_policy_from_env_value(std::env::var("QUEUE_ALREADY_SERVING_POLICY").ok())?,
        display_next_up_from_env_value(std::env::var("QUEUE_DISPLAY_NEXT_UP").ok())?,
        seed_counters_from_env_value(std::env::var("QUEUE_COUNTERS").ok())?,
    )?;
    let rest_addr = std::env::var("QUEUE_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    tracing::info!("++ Starting queue REST on {}", rest_addr);
    tracing::info!(
        "-- Already-serving policy {:?}, {} next-up on the board",
        cfg.already_serving(),
        cfg.display_next_up()
    );

    let app = router(AppState::new(Arc::new(cfg))?);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
