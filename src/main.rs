//! # SubClaw — subscription reminder bot
//!
//! Loads the client sheet, runs the hourly refresh / daily reminder /
//! heartbeat jobs and serves the WhatsApp webhook.
//!
//! Usage:
//!   subclaw                            # ~/.subclaw/config.toml, port from config
//!   subclaw --config ./subclaw.toml    # explicit config file
//!   subclaw --port 8080 --verbose

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use subclaw_channels::WhatsAppTransport;
use subclaw_core::{SubClawConfig, SystemClock};
use subclaw_gateway::{AppState, start_server};
use subclaw_lifecycle::{CommandDispatcher, Lifecycle, LifecycleSettings};
use subclaw_scheduler::{JobSchedule, SchedulerEngine, spawn_scheduler};
use subclaw_sheets::SheetsStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "subclaw",
    version,
    about = "📅 SubClaw — subscription reminders and reseller console over WhatsApp"
)]
struct Cli {
    /// Config file (default: ~/.subclaw/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the gateway port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn register_jobs(
    engine: &mut SchedulerEngine,
    config: &SubClawConfig,
    lifecycle: &Arc<Lifecycle>,
) -> subclaw_core::Result<()> {
    let lc = lifecycle.clone();
    engine.add_job(
        "refresh-cache",
        JobSchedule::cron(&config.schedule.refresh_cron),
        move || {
            let lc = lc.clone();
            async move {
                let _ = lc.refresh().await;
            }
        },
    )?;

    let lc = lifecycle.clone();
    engine.add_job(
        "reminder-sweep",
        JobSchedule::DailyAt {
            hour: config.schedule.reminder_hour,
            minute: config.schedule.reminder_minute,
        },
        move || {
            let lc = lc.clone();
            async move {
                lc.sweep().await;
            }
        },
    )?;

    let lc = lifecycle.clone();
    engine.add_job(
        "heartbeat",
        JobSchedule::cron(&config.schedule.heartbeat_cron),
        move || {
            let lc = lc.clone();
            async move {
                lc.heartbeat().await;
            }
        },
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "subclaw=debug,subclaw_lifecycle=debug,subclaw_gateway=debug,tower_http=debug"
    } else {
        "subclaw=info,subclaw_lifecycle=info,subclaw_scheduler=info,subclaw_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => SubClawConfig::load_from(Path::new(path))?,
        None => SubClawConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    config.validate()?;
    let settings = LifecycleSettings::from_config(&config)?;
    let tz = settings.timezone;

    let transport = Arc::new(WhatsAppTransport::new(config.whatsapp.clone()));
    transport
        .verify()
        .await
        .map_err(|e| anyhow::anyhow!("WhatsApp transport failed to initialize: {e}"))?;
    tracing::info!("📱 WhatsApp transport ready");

    let store = Arc::new(SheetsStore::new(&config.store));
    if !store.refreshes_token() {
        tracing::warn!("⚠️ Sheets uses a static access token; it stops working when it expires");
    }
    let lifecycle = Arc::new(Lifecycle::new(
        settings,
        store,
        transport,
        Arc::new(SystemClock),
    ));

    match lifecycle.refresh().await {
        Ok(count) => tracing::info!("📋 Loaded {} clients", count),
        Err(e) => tracing::warn!("⚠️ Initial refresh failed, starting with an empty cache: {}", e),
    }

    let mut engine = SchedulerEngine::new(tz);
    register_jobs(&mut engine, &config, &lifecycle)?;
    tracing::info!(
        "⏰ {} jobs registered (timezone {})",
        engine.job_count(),
        engine.timezone()
    );
    let engine = Arc::new(tokio::sync::Mutex::new(engine));
    tokio::spawn(spawn_scheduler(engine, config.schedule.check_interval_secs));

    let dispatcher = Arc::new(CommandDispatcher::new(lifecycle));
    if config.whatsapp.app_secret.is_empty() {
        tracing::warn!("⚠️ whatsapp.app_secret not set, every webhook delivery will be refused");
    }
    let state = AppState::new(
        dispatcher,
        config.whatsapp.webhook_verify_token.clone(),
        config.whatsapp.app_secret.clone(),
    );

    println!("📅 SubClaw v{}", env!("CARGO_PKG_VERSION"));
    println!("   🌐 Webhook: http://{}:{}/webhook/whatsapp", config.gateway.host, config.gateway.port);
    println!("   🩺 Health:  http://{}:{}/health", config.gateway.host, config.gateway.port);
    println!();

    start_server(&config.gateway, state).await
}
