//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache and geo setup, background tasks and
//! the Axum server lifecycle.

use anyhow::{Context, Result, anyhow};
use axum::ServiceExt;
use axum::extract::Request;
use axum_extra::extract::cookie::Key;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

use crate::application::job_worker::{JobContext, run_job_worker};
use crate::application::services::{FirewallService, UserService, VariableService};
use crate::config::Config;
use crate::domain::jobs::JobQueue;
use crate::domain::repositories::{
    LoginRecordRepository, SettingsRepository, UserRepository, VariableRepository,
};
use crate::infrastructure::cache::{CacheService, MemoryCache, RedisCache};
use crate::infrastructure::firewall::{
    AbuseIpDbReporter, FirewallReporter, FirewallRules, NullReporter,
};
use crate::infrastructure::geo::{IpLocator, ProxyDetector};
use crate::infrastructure::mail::{MailSender, MailgunSender};
use crate::infrastructure::persistence::{
    PgLoginRecordRepository, PgSettingsRepository, PgUserRepository, PgVariableRepository,
};
use crate::infrastructure::settings::SystemSettings;
use crate::routes::app_router;
use crate::security::{CaptchaRenderer, FontCaptchaRenderer};
use crate::state::AppState;
use crate::utils::fonts::load_font;
use crate::utils::watermark::Watermarker;

const SETTINGS_REFRESH: Duration = Duration::from_secs(60);
const SESSION_CLEANUP: Duration = Duration::from_secs(300);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Session store
/// - Redis cache (or in-memory fallback)
/// - Geo databases, firewall rules and system settings, with their reload tasks
/// - Mail sender and abuse reporter
/// - Background job worker
/// - Axum HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The cookie secret is unusable
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to migrate session store")?;
    tokio::spawn(
        session_store
            .clone()
            .continuously_delete_expired(SESSION_CLEANUP),
    );

    let cache: Arc<dyn CacheService> = if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using in-memory cache.", e);
                Arc::new(MemoryCache::new())
            }
        }
    } else {
        tracing::info!("Redis not configured, using in-memory cache");
        Arc::new(MemoryCache::new())
    };

    let pool = Arc::new(pool);
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let variables: Arc<dyn VariableRepository> = Arc::new(PgVariableRepository::new(pool.clone()));
    let login_records: Arc<dyn LoginRecordRepository> =
        Arc::new(PgLoginRecordRepository::new(pool.clone()));
    let settings_repository: Arc<dyn SettingsRepository> =
        Arc::new(PgSettingsRepository::new(pool.clone()));

    let settings = Arc::new(SystemSettings::new());
    let loaded = settings.refresh(settings_repository.as_ref()).await?;
    tracing::info!(count = loaded, "System settings loaded");
    settings
        .clone()
        .spawn_refresher(settings_repository, SETTINGS_REFRESH);

    let data_dir = config.data_dir.clone();
    let language = config.geo_language.clone();
    let time_zone = config.default_time_zone.clone();
    let locator = Arc::new(
        tokio::task::spawn_blocking(move || IpLocator::load(&data_dir, &language, &time_zone))
            .await?,
    );

    let rules = Arc::new(FirewallRules::load(&config.data_dir));
    rules
        .clone()
        .spawn_watcher(Duration::from_secs(config.rules_reload_seconds));

    let reporter: Arc<dyn FirewallReporter> = match &config.abuseipdb_api_key {
        Some(key) => Arc::new(AbuseIpDbReporter::new(key.clone())?),
        None => Arc::new(NullReporter),
    };
    tracing::info!(reporter = reporter.name(), "Firewall reporter configured");

    let firewall = Arc::new(FirewallService::new(
        rules,
        locator.clone(),
        settings.clone(),
        cache.clone(),
        reporter,
        config.login_error_threshold,
    ));

    let mailer: Option<Arc<dyn MailSender>> = match &config.mailgun {
        Some(mailgun) => {
            tracing::info!(from = %mailgun.from, "Mail delivery enabled (Mailgun)");
            Some(Arc::new(MailgunSender::new(mailgun, cache.clone())?))
        }
        None => {
            tracing::info!("Mail delivery disabled");
            None
        }
    };

    let proxy = match &config.proxy_check_base_url {
        Some(base_url) => Some(ProxyDetector::with_base_url(base_url.as_str())?),
        None => None,
    };

    let (jobs, job_rx) = JobQueue::new(config.job_queue_capacity);
    let job_context = Arc::new(JobContext {
        login_records,
        users: users.clone(),
        locator: locator.clone(),
        proxy,
        mailer,
    });
    tokio::spawn(run_job_worker(
        job_rx,
        job_context,
        config.job_worker_concurrency,
    ));

    let font = load_font(config.font_path.as_deref());
    let captcha: Option<Arc<dyn CaptchaRenderer>> = font
        .clone()
        .map(|font| Arc::new(FontCaptchaRenderer::new(font)) as Arc<dyn CaptchaRenderer>);
    let watermarker = Arc::new(Watermarker::new(settings.clone(), font));

    let cookie_key = Key::try_from(config.cookie_secret.as_bytes())
        .map_err(|e| anyhow!("Invalid COOKIE_SECRET: {e}"))?;

    let state = AppState {
        user_service: Arc::new(UserService::new(users)),
        variable_service: Arc::new(VariableService::new(variables)),
        firewall,
        locator,
        settings,
        cache,
        jobs,
        captcha,
        watermarker,
        cookie_key,
        behind_proxy: config.behind_proxy,
        secure_cookies: config.cookie_secure,
    };

    let app = app_router(state, session_store);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
