use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use curasphere_core::CoreConfig;

/// Main entry point for the Curasphere application
///
/// Resolves configuration from the environment (after loading `.env`), opens the database and
/// serves the REST API until interrupted.
///
/// # Environment Variables
/// - `CURASPHERE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DATABASE_URL`: SQLite path or `:memory:` (default: "curasphere.db")
/// - `SECRET_KEY`: token signing secret (required)
/// - `ALGORITHM`, `ACCESS_TOKEN_EXPIRE_MINUTES`: token settings
/// - `SMTP_*`, `EMAILS_FROM_EMAIL`: mail settings
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("curasphere=info".parse()?)
                .add_directive("curasphere_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::from_lookup(|key| std::env::var(key).ok())?);
    tracing::info!("Using database {}", cfg.database_url());
    let state = AppState::from_config(cfg)?;

    let rest_addr =
        std::env::var("CURASPHERE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("REST server listening on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
