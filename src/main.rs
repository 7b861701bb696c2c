use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

mod app;
mod auth;
mod broker;
mod config;
mod error;
mod mailer;
mod state;

use crate::auth::google::GoogleOAuth;
use crate::broker::{listener, Broker, EventPublisher};
use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tunehub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    let broker = Arc::new(Broker::connect(&config.amqp_url).await?);

    let google = match &config.google {
        Some(cfg) => Some(Arc::new(GoogleOAuth::new(cfg)?)),
        None => {
            warn!("Google OAuth not configured; /api/auth/google routes disabled");
            None
        }
    };

    // Welcome-mail consumer runs alongside the HTTP server on the same
    // broker connection.
    match &config.mail {
        Some(mail_cfg) => {
            let mailer = Arc::new(Mailer::from_config(mail_cfg)?);
            let consumer_broker = Arc::clone(&broker);
            tokio::spawn(async move {
                if let Err(e) = listener::run(consumer_broker, mailer).await {
                    error!(error = %e, "welcome mail listener stopped");
                }
            });
        }
        None => warn!("mail credentials not configured; welcome emails disabled"),
    }

    let state = AppState::from_parts(
        db,
        Arc::clone(&config),
        Arc::clone(&broker) as Arc<dyn EventPublisher>,
        google,
    );

    let app = app::build_app(state)?;
    app::serve(app).await?;

    info!("shutting down");
    broker.close().await?;
    Ok(())
}
