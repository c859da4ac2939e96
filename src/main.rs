use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use log::{info, warn};

use deskserver::api_router;
use deskserver::config::AppConfig;
use deskserver::email::{LogNotifier, Notifier, SmtpNotifier};
use deskserver::reminders::ReminderService;
use deskserver::shared::state::AppState;
use deskserver::store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let notifier: Arc<dyn Notifier> = if config.email.host.is_empty() {
        warn!("EMAIL_HOST not set, outbound mail will only be logged");
        Arc::new(LogNotifier)
    } else {
        Arc::new(
            SmtpNotifier::from_config(&config.email, &config.app_url)
                .context("Failed to build SMTP transport")?,
        )
    };

    let reminders = ReminderService::new(
        Arc::clone(&store),
        Arc::clone(&notifier),
        config.reminders.clone(),
    );
    reminders.spawn();

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        store,
        notifier,
        reminders,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, api_router(state))
        .await
        .context("Server error")?;
    Ok(())
}
