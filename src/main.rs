//! Feedback Funnel
//!
//! Feedback intake pipeline:
//! - HTTP and GitHub webhook intake, stored unprocessed then queued
//! - Redpanda work queue of record ids
//! - Background worker that enriches records with sentiment, category and summary
//! - ClickHouse record store

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseOffsetStore, ClickHouseStore};
use funnel_core::{RecordStore, WorkQueue};
use redpanda::{RedpandaConfig, RedpandaQueue};
use telemetry::{health, init_tracing_from_env, metrics};
use worker::{Analyzer, OpenAiAnalyzer, OpenAiConfig, WorkerConfig, WorkerScheduler};

/// How long shutdown waits for workers to finish their current item.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Which parts of the pipeline this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    All,
    Api,
    Worker,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "api" => Some(Self::Api),
            "worker" => Some(Self::Worker),
            _ => None,
        }
    }

    fn runs_api(self) -> bool {
        matches!(self, Self::All | Self::Api)
    }

    fn runs_worker(self) -> bool {
        matches!(self, Self::All | Self::Worker)
    }
}

/// Worker settings as they appear in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkerSettings {
    #[serde(default = "default_pop_error_pause_ms")]
    pop_error_pause_ms: u64,
    #[serde(default)]
    reconcile_enabled: bool,
    #[serde(default = "default_reconcile_interval_secs")]
    reconcile_interval_secs: u64,
    #[serde(default = "default_reconcile_min_age_secs")]
    reconcile_min_age_secs: u64,
}

fn default_pop_error_pause_ms() -> u64 {
    1000
}

fn default_reconcile_interval_secs() -> u64 {
    300
}

fn default_reconcile_min_age_secs() -> u64 {
    600
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            pop_error_pause_ms: default_pop_error_pause_ms(),
            reconcile_enabled: false,
            reconcile_interval_secs: default_reconcile_interval_secs(),
            reconcile_min_age_secs: default_reconcile_min_age_secs(),
        }
    }
}

impl From<&WorkerSettings> for WorkerConfig {
    fn from(settings: &WorkerSettings) -> Self {
        Self {
            pop_error_pause: Duration::from_millis(settings.pop_error_pause_ms),
            reconcile_enabled: settings.reconcile_enabled,
            reconcile_interval: Duration::from_secs(settings.reconcile_interval_secs),
            reconcile_min_age: Duration::from_secs(settings.reconcile_min_age_secs),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_role")]
    role: Role,

    /// GitHub webhook secret; empty disables signature checks
    #[serde(default)]
    webhook_secret: Option<String>,

    #[serde(default)]
    openai: OpenAiConfig,

    #[serde(default)]
    worker: WorkerSettings,

    #[serde(default)]
    redpanda: RedpandaConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_role() -> Role {
    Role::All
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            role: default_role(),
            webhook_secret: None,
            openai: OpenAiConfig::default(),
            worker: WorkerSettings::default(),
            redpanda: RedpandaConfig::default(),
            clickhouse: ClickHouseConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires explicit crypto provider selection before any TLS
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Feedback Funnel v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        role = ?config.role,
        brokers = ?config.redpanda.brokers,
        topic = %config.redpanda.topic,
        clickhouse = %config.clickhouse.url,
        "Loaded configuration"
    );

    let clickhouse = Arc::new(
        ClickHouseClient::new(config.clickhouse.clone())
            .context("Failed to create ClickHouse client")?,
    );

    if let Err(e) = clickhouse_client::health::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
        // Continue anyway - schema might already exist
    }

    redpanda::health::ensure_topic(&config.redpanda).await;

    check_health(&config, &clickhouse).await;

    let store: Arc<dyn RecordStore> = Arc::new(ClickHouseStore::new(clickhouse.clone()));
    let queue: Arc<dyn WorkQueue> = Arc::new(
        RedpandaQueue::new(config.redpanda.clone())
            .with_offset_store(Arc::new(ClickHouseOffsetStore::new(clickhouse.clone()))),
    );

    let shutdown = CancellationToken::new();

    let worker_handles = if config.role.runs_worker() {
        let analyzer: Arc<dyn Analyzer> = Arc::new(
            OpenAiAnalyzer::new(config.openai.clone())
                .context("Failed to create enrichment client")?,
        );
        let scheduler = WorkerScheduler::new(
            WorkerConfig::from(&config.worker),
            store.clone(),
            queue.clone(),
            analyzer,
        );
        scheduler.start(shutdown.clone())
    } else {
        Vec::new()
    };

    if config.role.runs_api() {
        let state = AppState::new(store.clone(), queue.clone(), config.webhook_secret.as_deref());
        let app = router(state);

        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .context("Invalid server address")?;

        info!("Listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind to address")?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;
    } else {
        shutdown_signal().await;
    }

    info!("Shutting down...");
    shutdown.cancel();

    for handle in worker_handles {
        match tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Worker task failed: {}", e),
            Err(_) => warn!("Worker did not stop within {:?}", WORKER_SHUTDOWN_TIMEOUT),
        }
    }

    let snapshot = metrics().snapshot();
    info!(
        received = snapshot.feedback_received,
        queued = snapshot.feedback_queued,
        processed = snapshot.items_processed,
        enrichment_failures = snapshot.enrichment_failures,
        orphaned = snapshot.feedback_orphaned,
        "Shutdown complete"
    );
    Ok(())
}

/// Load configuration from defaults, `config/default.toml` and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("FUNNEL")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Conventional variables, plus flat `FUNNEL_*` names for nested fields.
///
/// The config crate's nested parsing doesn't work reliably with
/// underscored field names.
fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(url) = var("DATABASE_URL") {
        config
            .clickhouse
            .apply_database_url(&url)
            .context("Invalid DATABASE_URL")?;
    }
    if let Some(brokers) = var("QUEUE_URL") {
        config.redpanda.brokers = RedpandaConfig::parse_brokers(&brokers);
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.openai.api_key = Some(key);
    }
    if let Some(secret) = var("GITHUB_WEBHOOK_SECRET") {
        config.webhook_secret = Some(secret);
    }
    if let Some(port) = var("PORT") {
        config.port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT: {}", port))?;
    }
    if let Some(role) = var("FUNNEL_ROLE") {
        config.role = Role::parse(&role)
            .with_context(|| format!("Invalid FUNNEL_ROLE: {} (expected all, api or worker)", role))?;
    }

    if let Some(username) = var("FUNNEL_REDPANDA_SASL_USERNAME") {
        config.redpanda.sasl_username = Some(username);
    }
    if let Some(password) = var("FUNNEL_REDPANDA_SASL_PASSWORD") {
        config.redpanda.sasl_password = Some(password);
    }
    if let Some(topic) = var("FUNNEL_REDPANDA_TOPIC") {
        config.redpanda.topic = topic;
    }
    if let Some(database) = var("FUNNEL_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Some(username) = var("FUNNEL_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Some(password) = var("FUNNEL_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Some(model) = var("FUNNEL_OPENAI_MODEL") {
        config.openai.model = model;
    }
    if let Some(base_url) = var("FUNNEL_OPENAI_BASE_URL") {
        config.openai.base_url = base_url;
    }
    if let Some(enabled) = var("FUNNEL_WORKER_RECONCILE_ENABLED") {
        config.worker.reconcile_enabled = enabled == "1" || enabled.eq_ignore_ascii_case("true");
    }

    Ok(())
}

/// Check component health on startup.
async fn check_health(config: &Config, clickhouse: &ClickHouseClient) {
    let redpanda_healthy = redpanda::health::check_connection(&config.redpanda).await;
    if redpanda_healthy {
        health().queue.set_healthy();
        info!("Redpanda connection: healthy");
    } else {
        health().queue.set_unhealthy("Connection failed");
        error!("Redpanda connection: unhealthy");
    }

    let ch_healthy = clickhouse_client::health::check_connection(clickhouse).await;
    if ch_healthy {
        health().store.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().store.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
