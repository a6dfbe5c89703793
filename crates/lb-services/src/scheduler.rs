//! # Sweeper and Scheduler
//!
//! One sweep walks every live thread through the archival check and then
//! purges expired sessions. The scheduler runs sweeps back to back on a fixed
//! interval in a single background task.

use crate::archival::ArchivalOutcome;
use crate::content::ContentManager;
use crate::session::SessionManager;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub archived: usize,
    /// Posts whose check or transition errored; they are retried next sweep.
    pub failed: usize,
    /// `None` when the session purge itself failed.
    pub sessions_purged: Option<u64>,
}

pub struct Sweeper {
    content: Arc<ContentManager>,
    sessions: Arc<SessionManager>,
    // Held for the whole sweep so sweeps never overlap.
    running: Mutex<()>,
}

impl Sweeper {
    pub fn new(content: Arc<ContentManager>, sessions: Arc<SessionManager>) -> Self {
        Self {
            content,
            sessions,
            running: Mutex::new(()),
        }
    }

    /// Runs one sweep as of `now`. Individual failures are logged and counted,
    /// never returned.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let _guard = self.running.lock().await;
        let mut report = SweepReport::default();

        match self.content.list_posts(false).await {
            Ok(posts) => {
                for post in posts {
                    report.examined += 1;
                    match self.content.archive_if_due(post.id, now).await {
                        Ok(ArchivalOutcome::Archived { .. }) => report.archived += 1,
                        Ok(_) => {}
                        Err(e) => {
                            report.failed += 1;
                            warn!(post_id = %post.id, error = %e, "archival check failed");
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "could not list live posts"),
        }

        report.sessions_purged = match self.sessions.expire_sweep(now).await {
            Ok(purged) => Some(purged),
            Err(e) => {
                warn!(error = %e, "session expiry sweep failed");
                None
            }
        };

        report
    }
}

/// Drives a [`Sweeper`] on a fixed interval until stopped.
pub struct Scheduler {
    sweeper: Arc<Sweeper>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(sweeper: Arc<Sweeper>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// Spawns the sweep loop. The first sweep runs one interval after start.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let Scheduler { sweeper, interval } = self;

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "archival scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = sweeper.sweep(Utc::now()).await;
                        let purged = report.sessions_purged.unwrap_or(0);
                        if report.archived > 0 || report.failed > 0 || purged > 0 {
                            info!(
                                examined = report.examined,
                                archived = report.archived,
                                failed = report.failed,
                                sessions_purged = report.sessions_purged,
                                "sweep finished"
                            );
                        } else {
                            debug!(examined = report.examined, "sweep finished, nothing to do");
                        }
                    }
                    changed = stop_rx.changed() => {
                        // A dropped sender counts as a stop request too.
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("archival scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

/// Owned lifecycle handle for the background sweep task.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Asks the loop to exit and waits for it. A sweep already in progress
    /// finishes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
