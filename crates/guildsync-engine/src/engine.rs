//! The bidirectional role synchronization engine.
//!
//! Two independent directions, each a short-lived run guarded by a
//! store-backed advisory lock and a sliding-window attempt counter:
//!
//! - **to_local**: the identity's directory roles are intersected with
//!   the mapping table and the winning local role is applied.
//! - **to_external**: the identity's local role is projected onto the
//!   directory with one bulk role replace.
//!
//! Per direction the run moves idle → locked → fetching → resolving →
//! (no-op | applying) → unlocked; loop-ceiling and lock-contention exits
//! never reach the fetching phase. When one direction hands off to the
//! other (the protected-role case, or a freshly linked member with no
//! directory roles yet), a one-shot token suppresses the immediate
//! return trip so the pair cannot feed each other forever.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use guildsync_cache::{keys, CacheStore};
use guildsync_core::{Directory, IdentityLinkStore, LocalRoleStore, LocalUserId, RoleId};

use crate::error::{SyncError, SyncResult};
use crate::outcome::{NoOpReason, SkipReason, SyncDirection, SyncOutcome};
use crate::settings::SyncSettings;

/// The synchronization engine.
///
/// All collaborators are injected; the engine holds no global state and
/// several engines may coexist in one process (multi-guild hosts).
pub struct SyncEngine {
    directory: Arc<dyn Directory>,
    store: Arc<dyn CacheStore>,
    links: Arc<dyn IdentityLinkStore>,
    roles: Arc<dyn LocalRoleStore>,
    settings: SyncSettings,
    /// One-shot return-trip tokens, consumed by the first read.
    suppressed: Mutex<HashSet<(LocalUserId, SyncDirection)>>,
}

impl SyncEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when the settings fail validation.
    pub fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn CacheStore>,
        links: Arc<dyn IdentityLinkStore>,
        roles: Arc<dyn LocalRoleStore>,
        settings: SyncSettings,
    ) -> SyncResult<Self> {
        settings
            .validate()
            .map_err(|message| SyncError::Config { message })?;

        Ok(Self {
            directory,
            store,
            links,
            roles,
            settings,
            suppressed: Mutex::new(HashSet::new()),
        })
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Direction A: reconcile the local role from the identity's
    /// directory roles.
    ///
    /// `force` marks an explicit user/administrator action: it resets
    /// the loop counter and bypasses cached directory reads.
    #[instrument(skip(self))]
    pub async fn sync_to_local(
        &self,
        local_id: LocalUserId,
        force: bool,
    ) -> SyncResult<SyncOutcome> {
        let direction = SyncDirection::ToLocal;

        if self.consume_suppression(local_id, direction).await {
            debug!(user = %local_id, "Return trip suppressed by delegation token");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::ReturnTripSuppressed,
            });
        }

        if let Some(skip) = self.loop_guard(local_id, direction, force).await {
            return Ok(skip);
        }

        let lock_key = keys::sync_lock(direction.key_name(), local_id);
        if !self.acquire_lock(&lock_key).await {
            debug!(user = %local_id, direction = %direction, "Sync already in progress");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::AlreadyInProgress,
            });
        }

        let result = self.run_to_local(local_id, force).await;
        self.release_lock(&lock_key).await;
        result
    }

    /// Direction B: reconcile the identity's directory roles from its
    /// local role.
    ///
    /// `previous_roles` are local roles the identity held before the
    /// change; their mapped directory roles are removed unless the
    /// current role maps them too. When `force` is set, an identity not
    /// yet present on the directory is treated as having no roles
    /// instead of producing a no-op (the just-linked case).
    #[instrument(skip(self, previous_roles))]
    pub async fn sync_to_external(
        &self,
        local_id: LocalUserId,
        local_role: &str,
        previous_roles: &[String],
        force: bool,
    ) -> SyncResult<SyncOutcome> {
        self.sync_to_external_guarded(local_id, local_role, previous_roles, force, force)
            .await
    }

    async fn sync_to_external_guarded(
        &self,
        local_id: LocalUserId,
        local_role: &str,
        previous_roles: &[String],
        force: bool,
        allow_missing: bool,
    ) -> SyncResult<SyncOutcome> {
        let direction = SyncDirection::ToExternal;

        if self.consume_suppression(local_id, direction).await {
            debug!(user = %local_id, "Return trip suppressed by delegation token");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::ReturnTripSuppressed,
            });
        }

        if let Some(skip) = self.loop_guard(local_id, direction, force).await {
            return Ok(skip);
        }

        let lock_key = keys::sync_lock(direction.key_name(), local_id);
        if !self.acquire_lock(&lock_key).await {
            debug!(user = %local_id, direction = %direction, "Sync already in progress");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::AlreadyInProgress,
            });
        }

        let result = self
            .run_to_external(local_id, local_role, previous_roles, allow_missing)
            .await;
        self.release_lock(&lock_key).await;
        result
    }

    async fn run_to_local(&self, local_id: LocalUserId, force: bool) -> SyncResult<SyncOutcome> {
        let external_id = self
            .links
            .external_id(local_id)
            .await?
            .ok_or(SyncError::NotLinked { local_id })?;

        // Always a fresh read: resolving against a stale role set would
        // happily re-apply state the directory no longer holds.
        let held = match self.directory.get_member_roles(external_id, true).await {
            Ok(roles) => roles,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let directory_roles = self.directory.list_roles(false).await?;
        let current = self.roles.current_role(local_id).await?;

        let Some(winner) =
            self.settings
                .mappings
                .resolve(&held, &directory_roles, self.settings.priority)
        else {
            if held.is_empty() && self.settings.bidirectional {
                // Fresh member with nothing assigned on the directory:
                // the local role is the richer source, so reconcile the
                // external side instead.
                debug!(user = %local_id, "No directory roles, delegating to to_external");
                return self.delegate_to_external(local_id, current, force).await;
            }
            return Ok(SyncOutcome::NoOp {
                reason: NoOpReason::NoMappingApplicable,
            });
        };

        if current.as_deref() == Some(winner.local_role.as_str()) {
            return Ok(SyncOutcome::NoOp {
                reason: NoOpReason::AlreadyCurrent,
            });
        }

        if let Some(current_role) = current.as_deref() {
            if self.settings.is_protected(current_role) {
                warn!(
                    user = %local_id,
                    current_role,
                    resolved = winner.local_role,
                    "Current local role is protected, refusing external-driven change"
                );
                if self.settings.bidirectional {
                    // Reconcile the directory to match the protected
                    // role instead.
                    return self
                        .delegate_to_external(local_id, Some(current_role.to_string()), force)
                        .await;
                }
                return Ok(SyncOutcome::NoOp {
                    reason: NoOpReason::ProtectedRole,
                });
            }
        }

        self.roles.set_role(local_id, &winner.local_role).await?;
        info!(
            user = %local_id,
            role = winner.local_role,
            source_role = %winner.source_role,
            "Applied local role from directory"
        );
        Ok(SyncOutcome::Applied {
            role: winner.local_role,
        })
    }

    async fn run_to_external(
        &self,
        local_id: LocalUserId,
        local_role: &str,
        previous_roles: &[String],
        allow_missing: bool,
    ) -> SyncResult<SyncOutcome> {
        let external_id = self
            .links
            .external_id(local_id)
            .await?
            .ok_or(SyncError::NotLinked { local_id })?;

        let current = match self.directory.get_member_roles(external_id, true).await {
            Ok(roles) => roles,
            Err(e) if e.is_not_found() => {
                if allow_missing {
                    Vec::new()
                } else {
                    debug!(user = %local_id, "Not a directory member yet, nothing to project");
                    return Ok(SyncOutcome::NoOp {
                        reason: NoOpReason::NotYetMember,
                    });
                }
            }
            Err(e) => return Err(e.into()),
        };

        let to_add = self.settings.mappings.directory_roles_for(local_role);
        let to_remove: Vec<RoleId> = previous_roles
            .iter()
            .filter(|previous| previous.as_str() != local_role)
            .flat_map(|previous| self.settings.mappings.directory_roles_for(previous))
            .filter(|role| !to_add.contains(role))
            .collect();

        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(SyncOutcome::NoOp {
                reason: NoOpReason::NoMappingApplicable,
            });
        }

        // New full set: current minus removals, plus additions, order
        // preserved and deduplicated.
        let mut new_roles: Vec<RoleId> = current
            .iter()
            .copied()
            .filter(|role| !to_remove.contains(role))
            .collect();
        for role in &to_add {
            if !new_roles.contains(role) {
                new_roles.push(*role);
            }
        }

        let current_set: HashSet<RoleId> = current.iter().copied().collect();
        let new_set: HashSet<RoleId> = new_roles.iter().copied().collect();
        if current_set == new_set {
            return Ok(SyncOutcome::NoOp {
                reason: NoOpReason::AlreadyCurrent,
            });
        }

        // One bulk replace, never incremental add/remove calls.
        self.directory
            .set_member_roles(external_id, new_roles)
            .await?;
        info!(
            user = %local_id,
            role = local_role,
            added = to_add.len(),
            removed = to_remove.len(),
            "Applied directory roles from local role"
        );
        Ok(SyncOutcome::Applied {
            role: local_role.to_string(),
        })
    }

    async fn delegate_to_external(
        &self,
        local_id: LocalUserId,
        current_role: Option<String>,
        force: bool,
    ) -> SyncResult<SyncOutcome> {
        let Some(role) = current_role else {
            // Nothing to project from either side.
            return Ok(SyncOutcome::NoOp {
                reason: NoOpReason::NoMappingApplicable,
            });
        };

        // The delegated run must not bounce straight back into this
        // direction; the token is consumed by the next to_local entry.
        self.suppress_next(local_id, SyncDirection::ToLocal).await;
        self.sync_to_external_guarded(local_id, &role, &[], force, true)
            .await
    }

    /// Checks the sliding-window attempt counter. A forced run resets
    /// the counter and always proceeds.
    async fn loop_guard(
        &self,
        local_id: LocalUserId,
        direction: SyncDirection,
        force: bool,
    ) -> Option<SyncOutcome> {
        let key = keys::sync_attempts(direction.key_name(), local_id);

        if force {
            if let Err(e) = self.store.delete(&key).await {
                debug!(error = %e, "Could not reset attempt counter, proceeding");
            }
            return None;
        }

        let window = Duration::from_secs(self.settings.loop_window_secs);
        match self.store.incr(&key, window).await {
            Ok(attempts) if attempts > self.settings.loop_ceiling => {
                // Logged distinctly from ordinary errors: this is the
                // loop breaker firing, not a failure.
                warn!(
                    user = %local_id,
                    direction = %direction,
                    attempts,
                    ceiling = self.settings.loop_ceiling,
                    "Attempt ceiling hit inside window, suspected feedback loop"
                );
                Some(SyncOutcome::Skipped {
                    reason: SkipReason::LoopSuspected { attempts },
                })
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Attempt counter unavailable, proceeding");
                None
            }
        }
    }

    async fn acquire_lock(&self, key: &str) -> bool {
        let ttl = Duration::from_secs(self.settings.lock_ttl_secs);
        match self.store.try_acquire_lock(key, ttl).await {
            Ok(acquired) => acquired,
            Err(e) => {
                // Fail open: a degraded store must not stop syncing.
                debug!(error = %e, "Lock store unavailable, proceeding unlocked");
                true
            }
        }
    }

    async fn release_lock(&self, key: &str) {
        if let Err(e) = self.store.release_lock(key).await {
            debug!(error = %e, "Could not release sync lock, TTL will clear it");
        }
    }

    async fn suppress_next(&self, local_id: LocalUserId, direction: SyncDirection) {
        self.suppressed.lock().await.insert((local_id, direction));
    }

    async fn consume_suppression(&self, local_id: LocalUserId, direction: SyncDirection) -> bool {
        self.suppressed.lock().await.remove(&(local_id, direction))
    }
}
