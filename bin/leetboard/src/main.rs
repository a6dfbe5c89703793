//! # Leetboard Binary
//!
//! Assembles the board from compile-time plugin features and keeps the
//! archival sweep running until the process is told to stop.

use anyhow::Context;
use lb_config::{LogFormat, Settings};
use lb_core::{AttachmentStore, AvatarAssigner, ContentStore, IdentityStore};
use lb_services::{ContentManager, Scheduler, SessionManager, Sweeper};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-sqlite")]
use lb_db_sqlite::SqliteStore;

#[cfg(feature = "storage-local")]
use lb_storage_local::LocalAttachmentStore;

#[cfg(feature = "avatar-http")]
use lb_avatar_http::HttpAvatarAssigner;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "avatar-http")))]
compile_error!("leetboard needs a database, an attachment store and an avatar plugin enabled");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings);

    // 1. Database (serves both identities and content)
    let db = Arc::new(
        SqliteStore::connect(
            settings.database_url.expose_secret(),
            settings.database_max_connections,
            settings.database_timeout(),
        )
        .await
        .context("opening database")?,
    );
    let identities: Arc<dyn IdentityStore> = db.clone();
    let content: Arc<dyn ContentStore> = db;

    // 2. Attachments
    let local = LocalAttachmentStore::new(
        settings.upload_dir.clone(),
        settings.upload_url_prefix.clone(),
    );
    local.ensure_root().await.context("creating upload directory")?;
    let attachments: Arc<dyn AttachmentStore> = Arc::new(local);

    // 3. Avatars
    let avatars: Arc<dyn AvatarAssigner> = Arc::new(
        HttpAvatarAssigner::new(
            settings.avatar_api_base_url.clone(),
            settings.avatar_catalog_size,
            settings.avatar_timeout(),
        )
        .context("building avatar client")?,
    );

    // 4. Services
    let sessions = Arc::new(
        SessionManager::new(identities, content.clone(), avatars)
            .with_ttl(chrono::Duration::days(i64::from(settings.session_ttl_days))),
    );
    let threads = Arc::new(ContentManager::new(content, attachments));
    let sweeper = Arc::new(Sweeper::new(threads, sessions));

    let scheduler = Scheduler::new(sweeper, settings.sweep_interval()).start();
    info!(
        upload_dir = %settings.upload_dir.display(),
        sweep_interval_secs = settings.sweep_interval_secs,
        "leetboard running"
    );

    shutdown_signal().await;
    info!("shutdown requested");
    scheduler.stop().await;
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
