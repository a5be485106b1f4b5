//! # Codeforces Weekly Update
//!
//! Scheduled batch job that keeps a snapshot of active rated Codeforces
//! users and mails out a weekly change report.
//!
//! ## Flow
//! 1. Scan the persisted snapshot (CSV table keyed by handle).
//! 2. Fetch the active rated roster; for every reachable user (handle and
//!    email present) fetch their submissions and derive the set of
//!    languages with accepted solutions, bounded-concurrently.
//! 3. Diff the two states: a full outer join per handle, classifying each
//!    as new, changed (with per-field deltas), or unchanged.
//! 4. Persist the merged snapshot, then render and mail the report. An
//!    uneventful week produces no mail at all.
//!
//! Snapshot correctness outranks notification delivery: the write-back
//! happens first and a failed send is only logged.

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod notify;
pub mod report;
pub mod store;

use api::CodeforcesClient;
use config::Config;
use error::AppError;
use notify::Mailer;
use report::{render, ReportOptions};
use store::SnapshotStore;

pub async fn run_weekly_update() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    let store = SnapshotStore::new(&config.snapshot_path);
    let client = CodeforcesClient::new(&config);

    info!("Loading snapshot from {}", store.path().display());
    let current = store.scan_all()?;
    info!("Known users: {}", current.len());

    let updates = client.fetch_updates(config.fetch_concurrency).await?;
    info!("Reachable users fetched: {}", updates.len());

    let (merged, report) = diff::diff(&current, &updates);
    info!("New or changed users: {}", report.len());

    store.upsert_batch(&merged)?;
    info!("Snapshot persisted: {} users", merged.len());

    let options = ReportOptions {
        rating_threshold: config.rating_threshold,
    };
    let Some(message) = render(&merged, &report, &options) else {
        info!("Nothing notable this week, no email");
        return Ok(());
    };

    if config.recipients.is_empty() {
        warn!("No recipients configured, skipping email");
        return Ok(());
    }

    match Mailer::from_config(&config) {
        Ok(mailer) => match mailer.send(message).await {
            Ok(()) => info!("Update email sent"),
            Err(e) => warn!("Failed to send update email: {e}"),
        },
        Err(e) => warn!("Mailer misconfigured, skipping email: {e}"),
    }

    Ok(())
}
