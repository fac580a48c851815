mod config;
mod http;
mod reminder;
mod services;
mod twiml;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tower_http::trace::TraceLayer;

use dispatch_adapters::messaging::TwilioSender;
use dispatch_adapters::persistence::sqlite::SqliteDb;
use dispatch_ports::outbound::ConfigRepository;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dispatch=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    let settings = config.relay_settings()?;
    let channels = config.channels()?;

    let db = SqliteDb::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    if let Some(numbers) = config.phone_numbers()? {
        db.set_phone_numbers(&numbers)
            .await
            .context("failed to store phone numbers")?;
        tracing::info!(
            inbound = %numbers.inbound,
            outbound = %numbers.outbound,
            "phone numbers configured"
        );
    }

    let mut sender = TwilioSender::new(
        config.twilio.account_sid.clone(),
        config.twilio.auth_token.clone(),
    )?;
    if let Some(url) = &config.twilio.base_url {
        sender = sender.with_base_url(url.as_str());
    }

    let tz = settings.timezone;
    let services = services::build(db, sender, settings);

    if config.reminder.enabled {
        tokio::spawn(reminder::run_loop(
            services.reminders.clone(),
            tz,
            config.reminder.hour,
            Duration::from_secs(config.reminder.poll_secs.max(1)),
        ));
        tracing::info!(hour = config.reminder.hour, "schedule reminders enabled");
    }

    let state = http::AppState {
        contacts: services.contacts,
        roster: services.roster,
        auth_token: Arc::from(config.auth_token.as_str()),
    };
    let app = http::router(state, channels).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("dispatch relay listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
