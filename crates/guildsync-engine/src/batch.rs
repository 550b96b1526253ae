//! Bulk synchronization across all linked identities.
//!
//! The runner walks the link table in bounded pages, pacing itself
//! between identities and between batches so a full sweep stays under
//! the directory's rate limit. Per-identity failures are tallied and
//! logged, never fatal to the sweep.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use guildsync_core::{IdentityLinkStore, LocalRoleStore};

use crate::engine::SyncEngine;
use crate::error::SyncResult;
use crate::outcome::SyncDirection;

/// Progress of one resumable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Identities handled so far, including earlier pages.
    pub processed: usize,
    /// Total linked identities at page start.
    pub total: usize,
    /// Whether the sweep is finished.
    pub complete: bool,
    /// Completed runs (applied or no-op) in this page.
    pub succeeded: usize,
    /// Failed runs in this page.
    pub failed: usize,
    /// Skipped runs (lock contention, loop ceiling, no local role) in
    /// this page.
    pub skipped: usize,
}

/// Final tally of a full sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Identities visited.
    pub total: usize,
    /// Completed runs.
    pub succeeded: usize,
    /// Failed runs.
    pub failed: usize,
    /// Skipped runs.
    pub skipped: usize,
    /// Wall-clock duration of the sweep.
    pub elapsed: Duration,
}

/// Drives the engine across the whole link table.
pub struct BatchRunner {
    engine: Arc<SyncEngine>,
    links: Arc<dyn IdentityLinkStore>,
    roles: Arc<dyn LocalRoleStore>,
}

impl BatchRunner {
    /// Creates a runner sharing the engine's stores.
    pub fn new(
        engine: Arc<SyncEngine>,
        links: Arc<dyn IdentityLinkStore>,
        roles: Arc<dyn LocalRoleStore>,
    ) -> Self {
        Self {
            engine,
            links,
            roles,
        }
    }

    /// Processes one page of identities, for callers that drive the
    /// sweep incrementally (a polling UI) instead of blocking on it.
    ///
    /// `batch_size` falls back to the configured default when `None`.
    pub async fn run_batch(
        &self,
        direction: SyncDirection,
        batch_size: Option<usize>,
        offset: usize,
    ) -> SyncResult<BatchProgress> {
        let settings = self.engine.settings();
        let size = batch_size.unwrap_or(settings.batch_size).max(1);
        let member_pause = Duration::from_millis(settings.member_pause_ms);

        let total = self.links.count().await?;
        let page = self.links.links(offset, size).await?;

        let mut progress = BatchProgress {
            processed: offset,
            total,
            complete: false,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };

        for (index, link) in page.iter().enumerate() {
            let outcome = match direction {
                SyncDirection::ToLocal => self.engine.sync_to_local(link.local_id, false).await,
                SyncDirection::ToExternal => {
                    match self.roles.current_role(link.local_id).await {
                        Ok(Some(role)) => {
                            self.engine
                                .sync_to_external(link.local_id, &role, &[], false)
                                .await
                        }
                        Ok(None) => {
                            // No local role to project; nothing to do.
                            progress.skipped += 1;
                            progress.processed += 1;
                            continue;
                        }
                        Err(e) => Err(e.into()),
                    }
                }
            };

            match outcome {
                Ok(outcome) if outcome.is_skipped() => progress.skipped += 1,
                Ok(_) => progress.succeeded += 1,
                Err(e) => {
                    warn!(
                        user = %link.local_id,
                        direction = %direction,
                        error = %e,
                        "Bulk sync failed for identity"
                    );
                    progress.failed += 1;
                }
            }
            progress.processed += 1;

            // Pace between identities, but not after the page's last.
            if index + 1 < page.len() && !member_pause.is_zero() {
                tokio::time::sleep(member_pause).await;
            }
        }

        progress.complete = page.len() < size || progress.processed >= total;
        Ok(progress)
    }

    /// Runs a full sweep, pausing between batches, and returns the
    /// final tally.
    pub async fn run_all(&self, direction: SyncDirection) -> SyncResult<BatchSummary> {
        let settings = self.engine.settings();
        let batch_pause = Duration::from_millis(settings.batch_pause_ms);

        let started = Instant::now();
        let mut summary = BatchSummary {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
        };

        let mut offset = 0;
        loop {
            let progress = self.run_batch(direction, None, offset).await?;
            summary.succeeded += progress.succeeded;
            summary.failed += progress.failed;
            summary.skipped += progress.skipped;
            offset = progress.processed;

            if progress.complete {
                summary.total = progress.processed;
                break;
            }
            if !batch_pause.is_zero() {
                tokio::time::sleep(batch_pause).await;
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            direction = %direction,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Bulk sync finished"
        );
        Ok(summary)
    }
}
