//! Entry point: loads configuration, prepares the database, then runs the
//! Telegram dispatcher, the job scheduler and the HTTP dashboard together.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use study_camp_bot::bot::handlers::BotHandler;
use study_camp_bot::config::Config;
use study_camp_bot::database::DatabaseManager;
use study_camp_bot::services::{DashboardService, Notifier, SchedulerService, TelegramNotifier};
use study_camp_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_camp_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!("Starting study camp bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Timezone: {}",
        config.database_url, config.http_port, config.timezone
    );

    let db = DatabaseManager::new(&config.database_url).await?;
    db.run_migrations().await?;
    let db = Arc::new(db);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone()));
    let handler = BotHandler::new(db.clone(), config.clone(), notifier.clone());

    let mut scheduler = SchedulerService::new(db.clone(), notifier, &config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create scheduler: {}", e))?;
    if let Err(e) = scheduler.start().await {
        tracing::error!("Failed to start scheduler: {}", e);
    }

    let dashboard = DashboardService::new(db.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;
    info!("Dashboard listening on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let dashboard_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, dashboard.router).await {
            tracing::error!("Dashboard server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = dashboard_task => {
            if let Err(e) = result {
                tracing::error!("Dashboard task error: {}", e);
            }
        }
    }

    if let Err(e) = scheduler.stop().await {
        tracing::warn!("Error stopping scheduler: {}", e);
    }

    log_system_event("Application stopped", None);
    Ok(())
}
