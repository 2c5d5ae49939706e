//! # Attendance Sync Server
//!
//! Keeps a DSS session alive, polls access records for the three destination
//! table families and serves a small HTTP surface (health probe and the
//! seven-day record dump).
//!
//! Bootstrap settings come from CLI/env (`.env` supported); every business
//! parameter is read from the control database at run time. Background tasks
//! stop on SIGINT/SIGTERM through a shared cancellation token.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lib_attendance::configs::Settings;
use lib_attendance::connections::{AuditLog, Database, PgStore, RelationalStore, SqlParamSource};
use lib_attendance::dss::{DssApi, RecordFetcher, SessionManager, VendorApi};
use lib_attendance::ingestors::{self, WeeklyBackfill};
use lib_attendance::loggers;
use lib_attendance::migration::{DoorCatalog, MigrationContext, SqlTargetStore};
use lib_attendance::notify::{FailureReporter, GatedNotifier, LogTransport, Notifier};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod attendance_logic;
use attendance_logic::{config::AppConfig, routes, state::AppState};

const LOG_FILE_PREFIX: &str = "server_attendance";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();
    let _log_guard = loggers::init_tracing(&config.log_dir, LOG_FILE_PREFIX, &config.log_level)?;
    info!(port = config.port, "Configuration loaded: DB URLs (hidden)");

    // --- Phase 1: Stores ---
    let pg = Arc::new(PgStore::connect(
        &[
            (Database::Control, config.control_db_url.clone()),
            (Database::Attendance, config.attendance_db_url.clone()),
        ],
        config.pool_max_size,
    )?);
    if let Err(e) = pg.ping().await {
        warn!(error = %e, "database not reachable yet, tasks will retry");
    }
    let store: Arc<dyn RelationalStore> = pg;
    let settings = Settings::new(Arc::new(SqlParamSource::new(store.clone())));
    let audit = AuditLog::new(store.clone());

    // --- Phase 2: Vendor session ---
    let api: Arc<dyn VendorApi> = Arc::new(DssApi::new(
        settings.clone(),
        Duration::from_secs(config.vendor_timeout_secs),
    )?);
    let session = Arc::new(SessionManager::new(api.clone(), settings.clone()));
    if let Err(e) = session.get_token().await {
        warn!(error = %e, "initial DSS login failed, polling will retry");
    }
    let fetcher = Arc::new(RecordFetcher::new(api, session.clone()));

    // --- Phase 3: Alerts and migration ---
    let notifier: Arc<dyn Notifier> = Arc::new(
        GatedNotifier::new(settings.clone(), Arc::new(LogTransport)).with_audit(audit.clone()),
    );
    let ctx = MigrationContext {
        store: Arc::new(SqlTargetStore::new(store.clone())),
        catalog: Arc::new(DoorCatalog::standard()?),
        reporter: FailureReporter::new(notifier, audit.clone()),
    };

    // --- Phase 4: Background tasks ---
    let cancel = CancellationToken::new();
    let mut handles = vec![session.spawn_maintenance(cancel.child_token())];
    handles.extend(ingestors::spawn_all(
        ingestors::standard_work_items(&settings, &fetcher, &ctx),
        &cancel,
    ));

    // --- Phase 5: HTTP surface ---
    let app = routes::router(AppState::new(Arc::new(WeeklyBackfill::new(fetcher, audit))));
    let addr = config.listen_addr()?;
    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "background task ended abnormally");
        }
    }
    info!("Shutdown complete.");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels every background task.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, initiating shutdown."),
        _ = terminate => info!("SIGTERM received, initiating shutdown."),
    }
    cancel.cancel();
}
