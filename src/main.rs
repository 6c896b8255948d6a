//! ReadHub user service entry point.
//!
//! Wires the database, cache, and authentication crates together and runs
//! until a shutdown signal arrives.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use readhub_auth::{AuthService, LoginAuditLog, PasswordHasher, SessionStore, TokenCodec};
use readhub_cache::CacheManager;
use readhub_core::config::AppConfig;
use readhub_core::error::AppError;
use readhub_core::traits::CacheProvider;
use readhub_database::DatabasePool;
use readhub_database::repositories::{
    PgLoginLogRepository, PgSessionRepository, PgUserRepository,
};

#[tokio::main]
async fn main() {
    let env = std::env::var("READHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(environment = %env, "configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ReadHub user service v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    readhub_database::migration::run_migrations(db.pool()).await?;
    tracing::info!("Database migrations complete");

    tracing::info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);
    if !cache.health_check().await.unwrap_or(false) {
        tracing::warn!("cache health check failed at startup");
    }

    let user_repo = Arc::new(PgUserRepository::new(db.pool().clone()));
    let session_repo = Arc::new(PgSessionRepository::new(db.pool().clone()));
    let login_log_repo = Arc::new(PgLoginLogRepository::new(db.pool().clone()));

    let hasher = PasswordHasher::new(&config.auth)?;
    let codec = TokenCodec::new(&config.auth);
    let store = SessionStore::new(Arc::clone(&cache), session_repo, &config.session);
    let audit = LoginAuditLog::new(login_log_repo);

    let _auth_service = Arc::new(AuthService::new(
        user_repo,
        hasher,
        codec,
        store,
        audit,
        config.auth.clone(),
        config.session.clone(),
    ));

    tracing::info!("Authentication service ready");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, closing connections...");

    db.close().await;
    tracing::info!("ReadHub user service shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
